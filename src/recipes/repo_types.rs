use serde::{Deserialize, Serialize};

use crate::store::Timestamp;

pub const DEFAULT_CATEGORY: &str = "other";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Recipe document as stored in the `recipes` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Recipe {
    /// Sort key for newest-first ordering; a missing timestamp counts as epoch 0.
    pub fn created_key(&self) -> Timestamp {
        self.created_at.unwrap_or_default()
    }
}

/// Caller-validated recipe content. The repository stamps ownership and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewRecipeRow<'a> {
    #[serde(flatten)]
    pub draft: &'a RecipeDraft,
    pub author_id: &'a str,
    pub author_name: &'a str,
}
