//! In-process store used when no `DATABASE_URL` is configured, and by the
//! test-suite. Each mutation runs under a single write guard, which makes
//! the read-modify-write atomic.

use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{CreateUserError, UserRepository},
        repo_types::{NewUser, User},
    },
    blogs::{
        model::{Blog, BlogPatch, Comment},
        query::{BlogFilter, BlogSort, SortDirection, SortField},
        repo::{BlogRepository, Change},
    },
};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    blogs: RwLock<HashMap<Uuid, Blog>>,
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, new_user: NewUser) -> Result<User, CreateUserError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == new_user.email) {
            return Err(CreateUserError::EmailTaken);
        }
        let user = new_user.into_user();
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn first(&self) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().min_by_key(|u| u.created_at).cloned())
    }
}

fn passes_filter(blog: &Blog, filter: &BlogFilter) -> bool {
    if let Some(tag) = &filter.tag {
        if !blog.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        if !blog.title.to_lowercase().contains(&needle)
            && !blog.description.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    true
}

fn compare(a: &Blog, b: &Blog, sort: BlogSort) -> Ordering {
    let ord = match sort.field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    };
    let ord = match sort.direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    };
    ord.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl BlogRepository for MemoryStore {
    async fn insert(&self, blog: &Blog) -> anyhow::Result<()> {
        self.blogs.write().await.insert(blog.id, blog.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Blog>> {
        Ok(self.blogs.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &BlogFilter, sort: BlogSort) -> anyhow::Result<Vec<Blog>> {
        let blogs = self.blogs.read().await;
        let mut out: Vec<Blog> = blogs
            .values()
            .filter(|b| passes_filter(b, filter))
            .cloned()
            .collect();
        out.sort_by(|a, b| compare(a, b, sort));
        Ok(out)
    }

    async fn update(&self, id: Uuid, patch: BlogPatch, now: OffsetDateTime) -> anyhow::Result<bool> {
        let mut blogs = self.blogs.write().await;
        let Some(blog) = blogs.get_mut(&id) else {
            return Ok(false);
        };
        blog.apply(patch, now);
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.blogs.write().await.remove(&id).is_some())
    }

    async fn push_comment(&self, blog_id: Uuid, comment: &Comment) -> anyhow::Result<bool> {
        let mut blogs = self.blogs.write().await;
        let Some(blog) = blogs.get_mut(&blog_id) else {
            return Ok(false);
        };
        blog.push_comment(comment.clone());
        Ok(true)
    }

    async fn remove_comment(&self, blog_id: Uuid, comment_id: Uuid) -> anyhow::Result<bool> {
        let mut blogs = self.blogs.write().await;
        Ok(blogs
            .get_mut(&blog_id)
            .and_then(|b| b.remove_comment(comment_id))
            .is_some())
    }

    async fn add_like(&self, blog_id: Uuid, user_id: Uuid) -> anyhow::Result<Change> {
        let mut blogs = self.blogs.write().await;
        Ok(match blogs.get_mut(&blog_id) {
            None => Change::Missing,
            Some(b) => {
                if b.add_like(user_id) {
                    Change::Applied
                } else {
                    Change::Unchanged
                }
            }
        })
    }

    async fn remove_like(&self, blog_id: Uuid, user_id: Uuid) -> anyhow::Result<Change> {
        let mut blogs = self.blogs.write().await;
        Ok(match blogs.get_mut(&blog_id) {
            None => Change::Missing,
            Some(b) => {
                if b.remove_like(user_id) {
                    Change::Applied
                } else {
                    Change::Unchanged
                }
            }
        })
    }

    async fn count_blogs(&self) -> anyhow::Result<i64> {
        Ok(self.blogs.read().await.len() as i64)
    }
}
