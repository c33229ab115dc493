use anyhow::Context;
use bytes::Bytes;
use rand::Rng;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::{error::UploadError, state::AppState};

const KEY_PREFIX: &str = "recipes";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Where the image bytes come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// `http(s)://` location to fetch the image from.
    Uri(String),
    Blob {
        body: Bytes,
        content_type: Option<String>,
    },
}

/// `<epoch-millis>_<7 random base36 chars>`
pub fn new_object_name() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..7)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{millis}_{suffix}")
}

async fn fetch_http(st: &AppState, uri: &str) -> Result<(Bytes, String), UploadError> {
    let resp = st
        .http
        .get(uri)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .with_context(|| format!("GET {uri}"))
        .map_err(UploadError::Fetch)?;
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let body = resp
        .bytes()
        .await
        .with_context(|| format!("read body of {uri}"))
        .map_err(UploadError::Fetch)?;
    Ok((body, content_type))
}

async fn resolve(st: &AppState, source: ImageSource) -> Result<(Bytes, String), UploadError> {
    match source {
        ImageSource::Blob { body, content_type } => Ok((
            body,
            content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        )),
        ImageSource::Uri(uri) => {
            // Device-local schemes (file://, content://) only make sense on the client.
            if uri.starts_with("http://") || uri.starts_with("https://") {
                fetch_http(st, &uri).await
            } else {
                Err(UploadError::UnsupportedSource(uri))
            }
        }
    }
}

/// Stores the image under `recipes/` and returns its download URL.
#[instrument(skip(st, source))]
pub async fn upload_recipe_image(st: &AppState, source: ImageSource) -> Result<String, UploadError> {
    let (body, content_type) = resolve(st, source).await?;
    let key = format!("{KEY_PREFIX}/{}", new_object_name());
    debug!(%key, size = body.len(), %content_type, "uploading image");

    st.storage
        .put_object(&key, body, &content_type)
        .await
        .with_context(|| format!("put_object {key}"))
        .map_err(UploadError::Store)?;
    st.storage
        .download_url(&key)
        .await
        .with_context(|| format!("download url for {key}"))
        .map_err(UploadError::Store)
}
