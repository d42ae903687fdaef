//! Image uploads for products, brands and partners.
//!
//! The raw request body is the file. Only raster images are accepted; the
//! declared `Content-Type` picks the stored extension, so a file is always
//! served back with an image type. Files land under the upload directory with
//! a random name and are served from the public URL prefix. Stored files are
//! never removed.

use anyhow::Context;
use axum::{
    body::{to_bytes, Body},
    extract::{Extension, Query},
    http::{header::CONTENT_LENGTH, header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{auth::require_route, ServiceError};
use crate::rbac::routes::Route;

pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Accepted upload formats. SVG is excluded because it can carry script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    /// Parse a `Content-Type` value, ignoring parameters and case.
    #[must_use]
    pub fn from_content_type(value: &str) -> Option<Self> {
        let mime = value.split(';').next()?.trim().to_ascii_lowercase();
        match mime.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Png => &["png"],
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Gif => &["gif"],
            Self::Webp => &["webp"],
        }
    }
}

#[derive(Clone, Debug)]
pub struct UploadConfig {
    dir: PathBuf,
    public_url: String,
    max_bytes: usize,
}

impl UploadConfig {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            public_url: "/uploads".to_string(),
            max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
        }
    }

    #[must_use]
    pub fn with_public_url(mut self, public_url: String) -> Self {
        self.public_url = public_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    #[must_use]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

/// Writes uploaded files to the local upload directory.
#[derive(Debug)]
pub struct UploadStore {
    config: UploadConfig,
}

impl UploadStore {
    #[must_use]
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Create the upload directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub async fn prepare(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.config.dir)
            .await
            .with_context(|| format!("failed to create upload dir {}", self.config.dir.display()))
    }

    /// # Errors
    /// `415` unless `content_type` is PNG, JPEG, GIF or WebP.
    pub fn check_content_type(
        &self,
        content_type: Option<&str>,
    ) -> Result<ImageKind, ServiceError> {
        content_type
            .and_then(ImageKind::from_content_type)
            .ok_or_else(|| {
                ServiceError::UnsupportedMediaType("Only image uploads are allowed".to_string())
            })
    }

    /// # Errors
    /// `413` when `len` exceeds the configured maximum.
    pub fn check_size(&self, len: usize) -> Result<(), ServiceError> {
        if len > self.config.max_bytes {
            Err(self.too_large())
        } else {
            Ok(())
        }
    }

    fn too_large(&self) -> ServiceError {
        ServiceError::PayloadTooLarge(format!(
            "File exceeds the {} byte limit",
            self.config.max_bytes
        ))
    }

    /// Persist `bytes` and return the public URL.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub async fn store(
        &self,
        kind: ImageKind,
        filename: Option<&str>,
        bytes: &[u8],
    ) -> anyhow::Result<String> {
        let name = stored_name(kind, filename);
        let path = self.config.dir.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write upload {}", path.display()))?;
        Ok(format!("{}/{}", self.config.public_url, name))
    }
}

/// Random file name with an extension of `kind`.
///
/// The extension of `filename` is kept only when it names the same format
/// (`.jpeg` for a JPEG); anything else gets the format's canonical extension.
#[must_use]
pub fn stored_name(kind: ImageKind, filename: Option<&str>) -> String {
    let id = Uuid::new_v4().simple().to_string();
    let allowed = kind.extensions();
    let extension = filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .and_then(|ext| allowed.iter().find(|candidate| **candidate == ext))
        .or_else(|| allowed.first())
        .copied()
        .unwrap_or("bin");
    format!("{id}.{extension}")
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Original file name; its extension is kept when it matches the content type.
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
}

#[utoipa::path(
    post,
    path = "/v1/uploads",
    params(UploadQuery),
    request_body(
        content = Vec<u8>,
        description = "Raw PNG, JPEG, GIF or WebP bytes",
        content_type = "image/*"
    ),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Not an image"),
    ),
    tag = "uploads"
)]
pub async fn upload(
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    store: Extension<Arc<UploadStore>>,
    body: Body,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, Route::AdminProducts).await?;

    let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok());
    let kind = store.check_content_type(content_type)?;

    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if let Some(len) = declared {
        store.check_size(len)?;
    }

    let bytes = to_bytes(body, store.config().max_bytes())
        .await
        .map_err(|_| store.too_large())?;
    if bytes.is_empty() {
        return Err(ServiceError::bad_request("File is empty"));
    }

    let url = store.store(kind, query.filename.as_deref(), &bytes).await?;
    info!(%url, size = bytes.len(), "upload stored");
    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_bytes: usize) -> UploadStore {
        UploadStore::new(UploadConfig::new(std::env::temp_dir()).with_max_bytes(max_bytes))
    }

    #[test]
    fn config_defaults() {
        let config = UploadConfig::new(PathBuf::from("uploads"));
        assert_eq!(config.public_url(), "/uploads");
        assert_eq!(config.max_bytes(), DEFAULT_UPLOAD_MAX_BYTES);

        let config = config.with_public_url("https://cdn.hiwajamil.com/media/".to_string());
        assert_eq!(config.public_url(), "https://cdn.hiwajamil.com/media");
    }

    #[test]
    fn only_images_are_accepted() {
        let store = store(DEFAULT_UPLOAD_MAX_BYTES);
        assert_eq!(store.check_content_type(Some("image/png")).ok(), Some(ImageKind::Png));
        assert_eq!(
            store.check_content_type(Some("IMAGE/JPEG; charset=binary")).ok(),
            Some(ImageKind::Jpeg)
        );
        assert!(matches!(
            store.check_content_type(Some("application/pdf")),
            Err(ServiceError::UnsupportedMediaType(_))
        ));
        assert!(store.check_content_type(Some("image/svg+xml")).is_err());
        assert!(store.check_content_type(Some("image/")).is_err());
        assert!(store.check_content_type(Some("text/html")).is_err());
        assert!(store.check_content_type(None).is_err());
    }

    #[test]
    fn oversize_is_rejected() {
        let store = store(1024);
        assert!(store.check_size(1024).is_ok());
        let err = store.check_size(1025);
        assert!(matches!(err, Err(ServiceError::PayloadTooLarge(_))));
        if let Err(err) = err {
            assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        }
    }

    #[test]
    fn stored_name_keeps_matching_extension() {
        let name = stored_name(ImageKind::Png, Some("Castrol Logo.PNG"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 32 + ".png".len());
        assert!(stored_name(ImageKind::Jpeg, Some("oil.jpeg")).ends_with(".jpeg"));
    }

    #[test]
    fn stored_name_follows_content_type_not_filename() {
        assert!(stored_name(ImageKind::Png, Some("logo.html")).ends_with(".png"));
        assert!(stored_name(ImageKind::Gif, Some("x.svg")).ends_with(".gif"));
        assert!(stored_name(ImageKind::Jpeg, Some(".htaccess")).ends_with(".jpg"));
        assert!(stored_name(ImageKind::Webp, Some("logo")).ends_with(".webp"));
        assert!(stored_name(ImageKind::Png, None).ends_with(".png"));
    }

    #[tokio::test]
    async fn store_writes_file_and_returns_url() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("hiwa-uploads-{}", Uuid::new_v4().simple()));
        let store = UploadStore::new(UploadConfig::new(dir.clone()));
        store.prepare().await?;

        let url = store.store(ImageKind::Webp, Some("oil.html"), b"RIFF").await?;
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".webp"));

        let name = url.trim_start_matches("/uploads/");
        assert_eq!(tokio::fs::read(dir.join(name)).await?, b"RIFF");

        tokio::fs::remove_dir_all(&dir).await?;
        Ok(())
    }
}
