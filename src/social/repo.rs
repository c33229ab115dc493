use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    error::PersistenceError,
    store::{DocumentStore, Filter, NewDocument, Query, Timestamp},
};

pub const FOLLOWS: &str = "follows";

/// Deterministic edge id, so one ordered pair maps to exactly one document.
pub fn follow_key(follower_id: &str, following_id: &str) -> String {
    format!("{follower_id}_{following_id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEdge {
    pub follower_id: String,
    pub following_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

#[instrument(skip(store))]
pub async fn follow_user(
    store: &dyn DocumentStore,
    follower_id: &str,
    following_id: &str,
) -> Result<(), PersistenceError> {
    if follower_id == following_id {
        debug!("self-follow ignored");
        return Ok(());
    }
    let edge = FollowEdge {
        follower_id: follower_id.to_string(),
        following_id: following_id.to_string(),
        created_at: None,
    };
    let doc = NewDocument::from_serialize(&edge)?.server_timestamp("createdAt");
    store
        .set(FOLLOWS, &follow_key(follower_id, following_id), doc)
        .await?;
    debug!("follow edge written");
    Ok(())
}

#[instrument(skip(store))]
pub async fn unfollow_user(
    store: &dyn DocumentStore,
    follower_id: &str,
    following_id: &str,
) -> Result<(), PersistenceError> {
    if follower_id == following_id {
        return Ok(());
    }
    store
        .delete(FOLLOWS, &follow_key(follower_id, following_id))
        .await
}

pub async fn is_following(
    store: &dyn DocumentStore,
    follower_id: &str,
    following_id: &str,
) -> Result<bool, PersistenceError> {
    let query = Query::new()
        .filter(Filter::eq("followerId", follower_id))
        .filter(Filter::eq("followingId", following_id));
    Ok(!store.query(FOLLOWS, query).await?.is_empty())
}

pub async fn get_following_ids(
    store: &dyn DocumentStore,
    follower_id: &str,
) -> Result<HashSet<String>, PersistenceError> {
    let docs = store
        .query(FOLLOWS, Query::new().filter(Filter::eq("followerId", follower_id)))
        .await?;
    docs.iter()
        .map(|d| d.decode::<FollowEdge>().map(|e| e.following_id))
        .collect()
}
