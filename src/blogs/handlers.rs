use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    blogs::{
        dto::{BlogResponse, CommentRequest, CreateBlogRequest, MessageResponse, UpdateBlogRequest},
        model::{BlogDraft, Tags},
        query::ListQuery,
        services::BlogStore,
    },
    error::{AppResult, BLOG_NOT_FOUND, COMMENT_NOT_FOUND},
    extract::{parse_id, ApiJson},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(list_blogs))
        .route("/blogs/:id", get(get_blog))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", post(create_blog))
        .route("/blogs/:id", put(update_blog).delete(delete_blog))
        .route("/blogs/:id/comments", post(add_comment))
        .route("/blogs/:id/comments/:comment_id", delete(delete_comment))
        .route("/blogs/:id/like", post(like_blog))
        .route("/blogs/:id/unlike", post(unlike_blog))
}

#[instrument(skip(store))]
pub async fn list_blogs(
    State(store): State<BlogStore>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<BlogResponse>>> {
    let (filter, sort) = query.into_parts();
    let blogs = store.list(&filter, sort).await?;
    Ok(Json(store.populate_many(blogs).await?))
}

#[instrument(skip(store))]
pub async fn get_blog(
    State(store): State<BlogStore>,
    Path(id): Path<String>,
) -> AppResult<Json<BlogResponse>> {
    let blog = store.get(parse_id(&id, BLOG_NOT_FOUND)?).await?;
    Ok(Json(store.populate(blog).await?))
}

#[instrument(skip(store, payload))]
pub async fn create_blog(
    State(store): State<BlogStore>,
    AuthUser(actor): AuthUser,
    ApiJson(payload): ApiJson<CreateBlogRequest>,
) -> AppResult<(StatusCode, Json<BlogResponse>)> {
    let draft = BlogDraft {
        title: payload.title,
        description: payload.description,
        tags: payload.tags.map(Tags::from).unwrap_or_default(),
    };
    let blog = store.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(store.populate(blog).await?)))
}

#[instrument(skip(store, payload))]
pub async fn update_blog(
    State(store): State<BlogStore>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateBlogRequest>,
) -> AppResult<Json<BlogResponse>> {
    let id = parse_id(&id, BLOG_NOT_FOUND)?;
    let blog = store.update(&actor, id, payload.into()).await?;
    Ok(Json(store.populate(blog).await?))
}

#[instrument(skip(store))]
pub async fn delete_blog(
    State(store): State<BlogStore>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    store.delete(&actor, parse_id(&id, BLOG_NOT_FOUND)?).await?;
    Ok(Json(MessageResponse { message: "Deleted" }))
}

#[instrument(skip(store, payload))]
pub async fn add_comment(
    State(store): State<BlogStore>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<CommentRequest>,
) -> AppResult<(StatusCode, Json<BlogResponse>)> {
    let id = parse_id(&id, BLOG_NOT_FOUND)?;
    let blog = store.add_comment(&actor, id, &payload.text).await?;
    Ok((StatusCode::CREATED, Json(store.populate(blog).await?)))
}

#[instrument(skip(store))]
pub async fn delete_comment(
    State(store): State<BlogStore>,
    AuthUser(actor): AuthUser,
    Path((id, comment_id)): Path<(String, String)>,
) -> AppResult<Json<BlogResponse>> {
    let id = parse_id(&id, BLOG_NOT_FOUND)?;
    let comment_id = parse_id(&comment_id, COMMENT_NOT_FOUND)?;
    let blog = store.delete_comment(&actor, id, comment_id).await?;
    Ok(Json(store.populate(blog).await?))
}

#[instrument(skip(store))]
pub async fn like_blog(
    State(store): State<BlogStore>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<BlogResponse>> {
    let blog = store.like(&actor, parse_id(&id, BLOG_NOT_FOUND)?).await?;
    Ok(Json(store.populate(blog).await?))
}

#[instrument(skip(store))]
pub async fn unlike_blog(
    State(store): State<BlogStore>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<BlogResponse>> {
    let blog = store.unlike(&actor, parse_id(&id, BLOG_NOT_FOUND)?).await?;
    Ok(Json(store.populate(blog).await?))
}
