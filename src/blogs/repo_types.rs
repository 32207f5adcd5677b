use std::collections::HashMap;

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::blogs::model::{Blog, Comment};

#[derive(Debug, FromRow)]
pub struct BlogRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct LikeRow {
    pub blog_id: Uuid,
    pub user_id: Uuid,
}

/// Stitches parent rows and their (already ordered) children into
/// aggregates, keeping the order of `blogs`.
pub fn assemble(blogs: Vec<BlogRow>, comments: Vec<CommentRow>, likes: Vec<LikeRow>) -> Vec<Blog> {
    let mut comments_by_blog: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    for c in comments {
        comments_by_blog.entry(c.blog_id).or_default().push(Comment {
            id: c.id,
            user_id: c.user_id,
            text: c.text,
            created_at: c.created_at,
        });
    }
    let mut likes_by_blog: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for l in likes {
        likes_by_blog.entry(l.blog_id).or_default().push(l.user_id);
    }

    blogs
        .into_iter()
        .map(|b| {
            Blog::restore(
                b.id,
                b.author_id,
                b.title,
                b.description,
                b.tags,
                likes_by_blog.remove(&b.id).unwrap_or_default(),
                comments_by_blog.remove(&b.id).unwrap_or_default(),
                b.created_at,
                b.updated_at,
            )
        })
        .collect()
}
