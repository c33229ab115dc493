use std::collections::HashSet;

use futures_util::future::try_join_all;
use tracing::{debug, instrument};

use crate::{
    error::AppError,
    recipes::{repo::list_recipes_by_authors, Recipe},
    social::repo::get_following_ids,
    store::{DocumentStore, IN_FILTER_LIMIT},
};

/// Splits `items` into consecutive chunks of at most `size` elements.
pub fn partition<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

/// Stable sort, largest key first. Chunks are only ordered internally, so the
/// concatenation has to be re-sorted as a whole.
pub fn merge_sorted_desc<T, K, F>(chunks: Vec<Vec<T>>, key: F) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut all: Vec<T> = chunks.into_iter().flatten().collect();
    all.sort_by(|a, b| key(b).cmp(&key(a)));
    all
}

/// Recipes authored by everyone `user_id` follows, newest first.
#[instrument(skip(store))]
pub async fn get_feed_recipes(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<Vec<Recipe>, AppError> {
    let following = get_following_ids(store, user_id)
        .await
        .map_err(AppError::FeedLoad)?;
    if following.is_empty() {
        return Ok(Vec::new());
    }

    let mut ids: Vec<String> = following.into_iter().collect();
    ids.sort();
    let batches = partition(&ids, IN_FILTER_LIMIT);
    debug!(following = ids.len(), batches = batches.len(), "loading feed");

    let chunks = try_join_all(
        batches
            .iter()
            .map(|batch| list_recipes_by_authors(store, batch)),
    )
    .await
    .map_err(AppError::FeedLoad)?;

    let mut seen = HashSet::new();
    let mut feed = merge_sorted_desc(chunks, Recipe::created_key);
    feed.retain(|r| seen.insert(r.id.clone()));
    Ok(feed)
}
