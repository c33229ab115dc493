pub mod services;

use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{auth::AuthUser, error::AppResult, recipes::Recipe, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/feed", get(get_feed))
}

#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn get_feed(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<Recipe>>> {
    Ok(Json(
        services::get_feed_recipes(state.store.as_ref(), &user.uid).await?,
    ))
}
