use axum::{
    extract::{Path, Query, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateRecipeRequest, CreatedRecipeResponse, SearchParams},
    repo,
    repo_types::Recipe,
    services,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_public_recipes))
        .route("/recipes/search", get(search_recipes))
        .route("/recipes/category/:category", get(list_by_category))
        .route("/recipes/:id", get(get_recipe))
        .route("/users/:uid/recipes", get(list_user_recipes))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/recipes", post(create_recipe))
}

#[instrument(skip(state))]
pub async fn list_public_recipes(State(state): State<AppState>) -> AppResult<Json<Vec<Recipe>>> {
    Ok(Json(repo::list_public_recipes(state.store.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn list_user_recipes(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<Json<Vec<Recipe>>> {
    Ok(Json(repo::list_user_recipes(state.store.as_ref(), &uid).await?))
}

#[instrument(skip(state))]
pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Json<Vec<Recipe>>> {
    Ok(Json(
        repo::list_recipes_by_category(state.store.as_ref(), &category).await?,
    ))
}

#[instrument(skip(state))]
pub async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Recipe>>> {
    let term = params.q.trim();
    Ok(Json(services::search_recipes(state.store.as_ref(), term).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Recipe>> {
    repo::get_recipe(state.store.as_ref(), &id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Recipe"))
}

/// POST /recipes
#[instrument(skip(state, user, body), fields(user_id = %user.uid))]
pub async fn create_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateRecipeRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<CreatedRecipeResponse>)> {
    let draft = services::validate_draft(body)?;
    let id = repo::create_recipe(state.store.as_ref(), &draft, &user.uid, user.author_name()).await?;
    info!(recipe_id = %id, "recipe published");

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/recipes/{id}")) {
        headers.insert(LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(CreatedRecipeResponse { id })))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn public_listing_is_a_read_route() {
        let app = read_routes().with_state(AppState::fake());
        let res = app
            .oneshot(Request::get("/recipes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let app = write_routes().with_state(AppState::fake());
        let res = app
            .oneshot(Request::get("/recipes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
