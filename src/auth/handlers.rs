use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        services::UserDirectory,
    },
    error::{AppError, AppResult, TOKEN_INVALID},
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user = UserDirectory::from_ref(&state)
        .register(&payload.name, &payload.email, &payload.password)
        .await?;
    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserDirectory::from_ref(&state)
        .authenticate(&payload.email, &payload.password)
        .await?;
    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(directory))]
pub async fn get_me(
    State(directory): State<UserDirectory>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = directory
        .find_by_id(actor.id)
        .await?
        .ok_or(AppError::Authentication(TOKEN_INVALID))?;
    Ok(Json(user.into()))
}
