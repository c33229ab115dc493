use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;

use super::repo;
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/follows", get(list_following))
        .route(
            "/follows/:uid",
            get(is_following).put(follow).delete(unfollow),
        )
}

#[derive(Debug, Serialize)]
pub struct FollowStatus {
    pub following: bool,
}

#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn list_following(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<String>>> {
    let mut ids: Vec<String> = repo::get_following_ids(state.store.as_ref(), &user.uid)
        .await?
        .into_iter()
        .collect();
    ids.sort();
    Ok(Json(ids))
}

#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn is_following(
    State(state): State<AppState>,
    user: AuthUser,
    Path(uid): Path<String>,
) -> AppResult<Json<FollowStatus>> {
    let following = repo::is_following(state.store.as_ref(), &user.uid, &uid).await?;
    Ok(Json(FollowStatus { following }))
}

#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn follow(
    State(state): State<AppState>,
    user: AuthUser,
    Path(uid): Path<String>,
) -> AppResult<StatusCode> {
    repo::follow_user(state.store.as_ref(), &user.uid, &uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn unfollow(
    State(state): State<AppState>,
    user: AuthUser,
    Path(uid): Path<String>,
) -> AppResult<StatusCode> {
    repo::unfollow_user(state.store.as_ref(), &user.uid, &uid).await?;
    Ok(StatusCode::NO_CONTENT)
}
