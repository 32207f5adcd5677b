//! The blog aggregate.
//!
//! A [`Blog`] owns its comments and likes. Both collections are private and
//! only change through the methods below, which keep likes unique and
//! comments in insertion order.

use time::OffsetDateTime;
use uuid::Uuid;

/// Canonical tag list. Built only from normalized input, so the store never
/// sees the delimited-string form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Splits a comma separated string, e.g. `"rust, web"`.
    pub fn from_delimited(raw: &str) -> Self {
        Self::from_list(raw.split(','))
    }

    pub fn from_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            items
                .into_iter()
                .map(|t| t.as_ref().trim().to_owned())
                .filter(|t| !t.is_empty())
                .collect(),
        )
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: OffsetDateTime,
}

impl Comment {
    pub fn new(user_id: Uuid, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            text: text.trim().to_owned(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Validated input for a new blog.
#[derive(Debug, Clone)]
pub struct BlogDraft {
    pub title: String,
    pub description: String,
    pub tags: Tags,
}

/// Partial update; `None` leaves the field as it is.
#[derive(Debug, Clone, Default)]
pub struct BlogPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Tags>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blog {
    pub id: Uuid,
    author_id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    likes: Vec<Uuid>,
    comments: Vec<Comment>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Blog {
    pub fn new(author_id: Uuid, draft: BlogDraft) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            author_id,
            title: draft.title.trim().to_owned(),
            description: draft.description.trim().to_owned(),
            tags: draft.tags.into_inner(),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds an aggregate loaded from storage.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: Uuid,
        author_id: Uuid,
        title: String,
        description: String,
        tags: Vec<String>,
        likes: Vec<Uuid>,
        comments: Vec<Comment>,
        created_at: OffsetDateTime,
        updated_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            author_id,
            title,
            description,
            tags,
            likes,
            comments,
            created_at,
            updated_at,
        }
    }

    pub fn author_id(&self) -> Uuid {
        self.author_id
    }

    pub fn likes(&self) -> &[Uuid] {
        &self.likes
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn comment(&self, comment_id: Uuid) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.likes.contains(&user_id)
    }

    pub fn apply(&mut self, patch: BlogPatch, now: OffsetDateTime) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_owned();
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_owned();
        }
        if let Some(tags) = patch.tags {
            self.tags = tags.into_inner();
        }
        self.updated_at = now;
    }

    /// Returns `false` when the user already liked this blog.
    pub fn add_like(&mut self, user_id: Uuid) -> bool {
        if self.is_liked_by(user_id) {
            return false;
        }
        self.likes.push(user_id);
        true
    }

    /// Returns `false` when there was no like to remove.
    pub fn remove_like(&mut self, user_id: Uuid) -> bool {
        let before = self.likes.len();
        self.likes.retain(|id| *id != user_id);
        self.likes.len() != before
    }

    pub fn push_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    pub fn remove_comment(&mut self, comment_id: Uuid) -> Option<Comment> {
        let idx = self.comments.iter().position(|c| c.id == comment_id)?;
        Some(self.comments.remove(idx))
    }

    /// Author first, then commenters, without repeats.
    pub fn referenced_users(&self) -> Vec<Uuid> {
        let mut ids = vec![self.author_id];
        for c in &self.comments {
            if !ids.contains(&c.user_id) {
                ids.push(c.user_id);
            }
        }
        ids
    }
}
