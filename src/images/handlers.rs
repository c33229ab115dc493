use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::services::{upload_recipe_image, ImageSource};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/images", post(upload_multipart)) // multipart field `file`
        .route("/images/uri", post(upload_from_uri))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[derive(Debug, Deserialize)]
pub struct UploadUriRequest {
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct UploadedImageResponse {
    pub url: String,
}

/// POST /images (multipart)
#[instrument(skip(state, user, mp), fields(user_id = %user.uid))]
pub async fn upload_multipart(
    State(state): State<AppState>,
    user: AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<UploadedImageResponse>> {
    let mut source = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().map(str::to_string);
            let body = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("invalid file field: {e}")))?;
            source = Some(ImageSource::Blob { body, content_type });
            break;
        }
    }
    let source = source.ok_or_else(|| AppError::Validation("file is required".into()))?;

    let url = upload_recipe_image(&state, source).await?;
    info!(%url, "image uploaded");
    Ok(Json(UploadedImageResponse { url }))
}

/// POST /images/uri { "uri": "https://..." }
#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn upload_from_uri(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UploadUriRequest>,
) -> AppResult<Json<UploadedImageResponse>> {
    let uri = body.uri.trim();
    if uri.is_empty() {
        return Err(AppError::Validation("uri is required".into()));
    }
    let url = upload_recipe_image(&state, ImageSource::Uri(uri.to_string())).await?;
    info!(%url, "image uploaded");
    Ok(Json(UploadedImageResponse { url }))
}
