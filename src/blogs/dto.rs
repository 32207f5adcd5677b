use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::dto::UserSummary,
    blogs::model::{Blog, BlogPatch, Comment, Tags},
};

/// Clients send tags either as `"a,b"` or as `["a", "b"]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Delimited(String),
}

impl From<TagsInput> for Tags {
    fn from(input: TagsInput) -> Self {
        match input {
            TagsInput::List(list) => Tags::from_list(list),
            TagsInput::Delimited(raw) => Tags::from_delimited(&raw),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBlogRequest {
    pub title: String,
    pub description: String,
    pub tags: Option<TagsInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<TagsInput>,
}

impl From<UpdateBlogRequest> for BlogPatch {
    fn from(r: UpdateBlogRequest) -> Self {
        Self {
            title: r.title,
            description: r.description,
            tags: r.tags.map(Tags::from),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: Option<UserSummary>,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A blog with author and commenters resolved to their display identity.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub author: Option<UserSummary>,
    pub likes: Vec<Uuid>,
    pub comments: Vec<CommentResponse>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl BlogResponse {
    pub fn assemble(blog: Blog, people: &HashMap<Uuid, UserSummary>) -> Self {
        let comments = blog
            .comments()
            .iter()
            .map(|c: &Comment| CommentResponse {
                id: c.id,
                user: people.get(&c.user_id).cloned(),
                text: c.text.clone(),
                created_at: c.created_at,
            })
            .collect();
        Self {
            id: blog.id,
            author: people.get(&blog.author_id()).cloned(),
            likes: blog.likes().to_vec(),
            comments,
            title: blog.title,
            description: blog.description,
            tags: blog.tags,
            created_at: blog.created_at,
            updated_at: blog.updated_at,
        }
    }
}
