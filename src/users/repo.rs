use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    auth::AuthUser,
    error::{AppError, PersistenceError},
    recipes::repo::list_public_recipes,
    store::{Document, DocumentStore, NewDocument, Query},
};

pub const USERS: &str = "users";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Taken from the document id; older profiles may not carry the field.
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
}

impl UserProfile {
    pub fn from_identity(user: &AuthUser) -> Self {
        Self {
            uid: user.uid.clone(),
            display_name: user.display_name.clone().unwrap_or_default(),
            email: user.email.clone().unwrap_or_default(),
            photo_url: user.photo_url.clone().unwrap_or_default(),
        }
    }
}

fn decode(doc: &Document) -> Result<UserProfile, PersistenceError> {
    let mut profile: UserProfile = doc.decode()?;
    profile.uid = doc.id.clone();
    Ok(profile)
}

/// Creates `users/{uid}` on first sight. An existing profile is returned untouched.
#[instrument(skip(store, user), fields(user_id = %user.uid))]
pub async fn ensure_user_profile(
    store: &dyn DocumentStore,
    user: &AuthUser,
) -> Result<UserProfile, PersistenceError> {
    if let Some(doc) = store.get(USERS, &user.uid).await? {
        return decode(&doc);
    }
    let profile = UserProfile::from_identity(user);
    store
        .set(USERS, &profile.uid, NewDocument::from_serialize(&profile)?)
        .await?;
    debug!("user profile created");
    Ok(profile)
}

pub async fn get_user_profile(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Option<UserProfile>, PersistenceError> {
    store.get(USERS, uid).await?.as_ref().map(decode).transpose()
}

/// Case-insensitive display-name search. With no profile hits, falls back to
/// the distinct authors of matching public recipes.
pub async fn search_users(
    store: &dyn DocumentStore,
    term: &str,
) -> Result<Vec<UserProfile>, PersistenceError> {
    let needle = term.to_lowercase();
    let docs = store.query(USERS, Query::new()).await?;
    let mut found = Vec::new();
    for doc in &docs {
        let profile = decode(doc)?;
        if profile.display_name.to_lowercase().contains(&needle) {
            found.push(profile);
        }
    }
    if !found.is_empty() {
        return Ok(found);
    }

    let recipes = list_public_recipes(store).await.map_err(|e| match e {
        AppError::RecipeLoad { source, .. } | AppError::Persistence(source) => source,
        other => PersistenceError::msg(other.to_string()),
    })?;
    let mut authors: Vec<UserProfile> = Vec::new();
    for recipe in recipes {
        if !recipe.author_name.to_lowercase().contains(&needle) {
            continue;
        }
        match authors.iter_mut().find(|a| a.uid == recipe.author_id) {
            Some(existing) => existing.display_name = recipe.author_name,
            None => authors.push(UserProfile {
                uid: recipe.author_id,
                display_name: recipe.author_name,
                email: String::new(),
                photo_url: String::new(),
            }),
        }
    }
    Ok(authors)
}
