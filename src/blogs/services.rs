use std::{collections::HashMap, sync::Arc};

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    auth::{dto::UserSummary, extractors::Actor, repo::UserRepository, services::UserDirectory},
    blogs::{
        dto::BlogResponse,
        model::{Blog, BlogDraft, BlogPatch, Comment},
        policy::{can_delete_comment, can_mutate},
        query::{BlogFilter, BlogSort},
        repo::{BlogRepository, Change},
    },
    error::{AppError, AppResult, FieldErrors, BLOG_NOT_FOUND, COMMENT_NOT_FOUND},
    state::AppState,
    validation::{check_comment, check_description, check_tag_count, check_title},
};

/// Blog operations with validation and ownership checks in front of the
/// repository.
#[derive(Clone)]
pub struct BlogStore {
    blogs: Arc<dyn BlogRepository>,
    people: UserDirectory,
}

impl FromRef<AppState> for BlogStore {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.blogs.clone(), state.users.clone())
    }
}

fn validate_draft(draft: &BlogDraft) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    if let Some(msg) = check_title(&draft.title) {
        errors.insert("title".into(), msg.into());
    }
    if let Some(msg) = check_description(&draft.description) {
        errors.insert("description".into(), msg.into());
    }
    if let Some(msg) = check_tag_count(draft.tags.count()) {
        errors.insert("tags".into(), msg.into());
    }
    AppError::from_fields(errors).map_or(Ok(()), Err)
}

fn validate_patch(patch: &BlogPatch) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    if let Some(msg) = patch.title.as_deref().and_then(check_title) {
        errors.insert("title".into(), msg.into());
    }
    if let Some(msg) = patch.description.as_deref().and_then(check_description) {
        errors.insert("description".into(), msg.into());
    }
    if let Some(msg) = patch.tags.as_ref().and_then(|t| check_tag_count(t.count())) {
        errors.insert("tags".into(), msg.into());
    }
    AppError::from_fields(errors).map_or(Ok(()), Err)
}

impl BlogStore {
    pub fn new(blogs: Arc<dyn BlogRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            blogs,
            people: UserDirectory::new(users),
        }
    }

    pub async fn create(&self, actor: &Actor, draft: BlogDraft) -> AppResult<Blog> {
        validate_draft(&draft)?;
        let blog = Blog::new(actor.id, draft);
        self.blogs.insert(&blog).await?;
        info!(blog_id = %blog.id, author_id = %actor.id, "blog created");
        Ok(blog)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Blog> {
        self.blogs
            .get(id)
            .await?
            .ok_or(AppError::NotFound(BLOG_NOT_FOUND))
    }

    pub async fn list(&self, filter: &BlogFilter, sort: BlogSort) -> AppResult<Vec<Blog>> {
        let blogs = self.blogs.list(filter, sort).await?;
        debug!(count = blogs.len(), ?filter, ?sort, "blogs listed");
        Ok(blogs)
    }

    /// Fetches the blog and checks that `actor` may change it.
    async fn owned(&self, actor: &Actor, id: Uuid) -> AppResult<Blog> {
        let blog = self.get(id).await?;
        if !can_mutate(actor, blog.author_id()) {
            info!(blog_id = %id, actor_id = %actor.id, "blog mutation forbidden");
            return Err(AppError::Authorization);
        }
        Ok(blog)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, patch: BlogPatch) -> AppResult<Blog> {
        self.owned(actor, id).await?;
        validate_patch(&patch)?;
        if !self
            .blogs
            .update(id, patch, OffsetDateTime::now_utc())
            .await?
        {
            return Err(AppError::NotFound(BLOG_NOT_FOUND));
        }
        info!(blog_id = %id, actor_id = %actor.id, "blog updated");
        self.get(id).await
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        self.owned(actor, id).await?;
        if !self.blogs.delete(id).await? {
            return Err(AppError::NotFound(BLOG_NOT_FOUND));
        }
        info!(blog_id = %id, actor_id = %actor.id, "blog deleted");
        Ok(())
    }

    /// Any authenticated user may comment.
    pub async fn add_comment(&self, actor: &Actor, blog_id: Uuid, text: &str) -> AppResult<Blog> {
        if let Some(msg) = check_comment(text) {
            return Err(AppError::invalid(msg));
        }
        let comment = Comment::new(actor.id, text);
        if !self.blogs.push_comment(blog_id, &comment).await? {
            return Err(AppError::NotFound(BLOG_NOT_FOUND));
        }
        info!(%blog_id, comment_id = %comment.id, actor_id = %actor.id, "comment added");
        self.get(blog_id).await
    }

    pub async fn delete_comment(
        &self,
        actor: &Actor,
        blog_id: Uuid,
        comment_id: Uuid,
    ) -> AppResult<Blog> {
        let blog = self.get(blog_id).await?;
        let comment = blog
            .comment(comment_id)
            .ok_or(AppError::NotFound(COMMENT_NOT_FOUND))?;
        if !can_delete_comment(actor, comment.user_id, blog.author_id()) {
            info!(%blog_id, %comment_id, actor_id = %actor.id, "comment deletion forbidden");
            return Err(AppError::Authorization);
        }
        if !self.blogs.remove_comment(blog_id, comment_id).await? {
            return Err(AppError::NotFound(COMMENT_NOT_FOUND));
        }
        info!(%blog_id, %comment_id, actor_id = %actor.id, "comment deleted");
        self.get(blog_id).await
    }

    /// Liking twice is rejected rather than ignored.
    pub async fn like(&self, actor: &Actor, blog_id: Uuid) -> AppResult<Blog> {
        match self.blogs.add_like(blog_id, actor.id).await? {
            Change::Applied => {}
            Change::Unchanged => return Err(AppError::AlreadyLiked),
            Change::Missing => return Err(AppError::NotFound(BLOG_NOT_FOUND)),
        }
        debug!(%blog_id, actor_id = %actor.id, "blog liked");
        self.get(blog_id).await
    }

    pub async fn unlike(&self, actor: &Actor, blog_id: Uuid) -> AppResult<Blog> {
        match self.blogs.remove_like(blog_id, actor.id).await? {
            Change::Applied => {}
            Change::Unchanged => return Err(AppError::NotLiked),
            Change::Missing => return Err(AppError::NotFound(BLOG_NOT_FOUND)),
        }
        debug!(%blog_id, actor_id = %actor.id, "blog unliked");
        self.get(blog_id).await
    }

    /// Resolves author and commenter identities for a single blog.
    pub async fn populate(&self, blog: Blog) -> AppResult<BlogResponse> {
        Ok(self.populate_many(vec![blog]).await?.remove(0))
    }

    /// One user lookup for the whole batch.
    pub async fn populate_many(&self, blogs: Vec<Blog>) -> AppResult<Vec<BlogResponse>> {
        let mut ids: Vec<Uuid> = blogs.iter().flat_map(Blog::referenced_users).collect();
        ids.sort_unstable();
        ids.dedup();

        let people: HashMap<Uuid, UserSummary> = self
            .people
            .find_many(&ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();

        Ok(blogs
            .into_iter()
            .map(|b| BlogResponse::assemble(b, &people))
            .collect())
    }
}
