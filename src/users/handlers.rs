use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::repo::{self, UserProfile};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", put(ensure_me))
        .route("/users/search", get(search_users))
        .route("/users/:uid", get(get_user))
}

#[derive(Debug, Deserialize)]
pub struct UserSearchParams {
    #[serde(default)]
    pub q: String,
}

/// PUT /users/me: registers the caller's profile from token claims on first login.
#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn ensure_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(repo::ensure_user_profile(state.store.as_ref(), &user).await?))
}

#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<UserSearchParams>,
) -> AppResult<Json<Vec<UserProfile>>> {
    Ok(Json(
        repo::search_users(state.store.as_ref(), params.q.trim()).await?,
    ))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<Json<UserProfile>> {
    repo::get_user_profile(state.store.as_ref(), &uid)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("User"))
}
