use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Any read or write failure reported by a `DocumentStore`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct PersistenceError(#[from] anyhow::Error);

impl PersistenceError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self(anyhow::anyhow!(message.into()))
    }
}

/// Failure while turning an image source into a stored object.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported image source: {0}")]
    UnsupportedSource(String),
    #[error("failed to fetch image source")]
    Fetch(#[source] anyhow::Error),
    #[error("failed to store image")]
    Store(#[source] anyhow::Error),
}

/// Domain errors surfaced to callers of the data-access layer and the HTTP API.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to create recipe")]
    RecipeCreate(#[source] PersistenceError),

    #[error("{message}")]
    RecipeLoad {
        message: &'static str,
        #[source]
        source: PersistenceError,
    },

    #[error("Failed to load feed")]
    FeedLoad(#[source] PersistenceError),

    #[error("Failed to upload image")]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl AppError {
    pub fn recipe_load(message: &'static str) -> impl FnOnce(PersistenceError) -> Self {
        move |source| AppError::RecipeLoad { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upload(UploadError::UnsupportedSource(_)) => StatusCode::BAD_REQUEST,
            AppError::Upload(UploadError::Fetch(_)) => StatusCode::BAD_GATEWAY,
            AppError::RecipeCreate(_)
            | AppError::RecipeLoad { .. }
            | AppError::FeedLoad(_)
            | AppError::Upload(UploadError::Store(_))
            | AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Upload(UploadError::UnsupportedSource(_)) => {
                format!("{}: {}", self, self.source_message())
            }
            AppError::Persistence(_) => "Storage request failed".to_string(),
            _ => self.to_string(),
        }
    }

    fn source_message(&self) -> String {
        std::error::Error::source(self)
            .map(|e| e.to_string())
            .unwrap_or_default()
    }

    /// Full cause chain, used for logs only.
    pub fn chain(&self) -> String {
        let mut parts = vec![self.to_string()];
        let mut cur = std::error::Error::source(self);
        while let Some(e) = cur {
            parts.push(e.to_string());
            cur = e.source();
        }
        parts.join(": ")
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self.chain(), "request failed");
        }
        let body = Json(ErrorBody {
            error: self.public_message(),
        });
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn store_failure() -> PersistenceError {
        PersistenceError::msg("connection reset")
    }

    #[test]
    fn recipe_errors_keep_domain_messages() {
        let err = AppError::recipe_load("Failed to load user recipes")(store_failure());
        assert_eq!(err.to_string(), "Failed to load user recipes");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.chain().contains("connection reset"));

        let err = AppError::RecipeCreate(store_failure());
        assert_eq!(err.to_string(), "Failed to create recipe");
    }

    #[test]
    fn chain_lists_each_cause_once() {
        let source = PersistenceError::from(anyhow::anyhow!("connection reset").context("query recipes"));
        assert_eq!(source.to_string(), "query recipes");

        let err = AppError::RecipeCreate(source);
        assert_eq!(err.chain(), "Failed to create recipe: query recipes: connection reset");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::Validation("title is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth("missing token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::NotFound("Recipe").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::FeedLoad(store_failure()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(UploadError::UnsupportedSource("ftp://x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(UploadError::Fetch(anyhow::anyhow!("timeout"))).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(UploadError::Store(anyhow::anyhow!("s3 down"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unsupported_source_message_names_the_source() {
        let err = AppError::from(UploadError::UnsupportedSource("ftp://host/a.png".into()));
        let msg = err.public_message();
        assert!(msg.starts_with("Failed to upload image"));
        assert!(msg.contains("ftp://host/a.png"));
    }

    #[test]
    fn into_response_sets_status() {
        let response = AppError::NotFound("Recipe").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
