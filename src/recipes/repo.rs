use tracing::{debug, instrument};

use super::repo_types::{NewRecipeRow, Recipe, RecipeDraft};
use crate::{
    error::{AppError, PersistenceError},
    store::{Direction, Document, DocumentStore, Filter, NewDocument, Query},
};

pub const RECIPES: &str = "recipes";

fn newest_first() -> Query {
    Query::new().order_by("createdAt", Direction::Desc)
}

fn decode_all(docs: Vec<Document>) -> Result<Vec<Recipe>, PersistenceError> {
    docs.iter().map(Document::decode::<Recipe>).collect()
}

async fn fetch(store: &dyn DocumentStore, query: Query) -> Result<Vec<Recipe>, PersistenceError> {
    let docs = store.query(RECIPES, query).await?;
    decode_all(docs)
}

/// Persists a caller-validated draft owned by `user_id`. The store stamps
/// `createdAt` and `updatedAt`.
#[instrument(skip(store, draft), fields(title = %draft.title))]
pub async fn create_recipe(
    store: &dyn DocumentStore,
    draft: &RecipeDraft,
    user_id: &str,
    author_name: &str,
) -> Result<String, AppError> {
    let row = NewRecipeRow {
        draft,
        author_id: user_id,
        author_name,
    };
    let doc = NewDocument::from_serialize(&row)
        .map_err(AppError::RecipeCreate)?
        .server_timestamp("createdAt")
        .server_timestamp("updatedAt");

    let id = store
        .add(RECIPES, doc)
        .await
        .map_err(AppError::RecipeCreate)?;
    debug!(%id, "recipe created");
    Ok(id)
}

pub async fn list_public_recipes(store: &dyn DocumentStore) -> Result<Vec<Recipe>, AppError> {
    fetch(store, newest_first())
        .await
        .map_err(AppError::recipe_load("Failed to load recipes"))
}

pub async fn list_user_recipes(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<Vec<Recipe>, AppError> {
    fetch(store, newest_first().filter(Filter::eq("authorId", user_id)))
        .await
        .map_err(AppError::recipe_load("Failed to load user recipes"))
}

/// Exact match on the lower-cased input. Stored categories keep the case they were written with.
pub async fn list_recipes_by_category(
    store: &dyn DocumentStore,
    category: &str,
) -> Result<Vec<Recipe>, AppError> {
    let category = category.to_lowercase();
    fetch(store, newest_first().filter(Filter::eq("category", category)))
        .await
        .map_err(AppError::recipe_load("Failed to load recipes by category"))
}

pub async fn get_recipe(store: &dyn DocumentStore, id: &str) -> Result<Option<Recipe>, AppError> {
    let load = || AppError::recipe_load("Failed to load recipe");
    match store.get(RECIPES, id).await.map_err(load())? {
        Some(doc) => doc.decode().map(Some).map_err(load()),
        None => Ok(None),
    }
}

/// One `authorId IN (..)` query. `author_ids` must not exceed `IN_FILTER_LIMIT`.
pub async fn list_recipes_by_authors(
    store: &dyn DocumentStore,
    author_ids: &[String],
) -> Result<Vec<Recipe>, PersistenceError> {
    fetch(
        store,
        newest_first().filter(Filter::is_in("authorId", author_ids.iter().cloned())),
    )
    .await
}
