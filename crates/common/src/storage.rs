//! Remote media storage client.
//!
//! Post images live on an external image-hosting provider. The provider is
//! an opaque collaborator: given file bytes or a source URL plus a target
//! folder, it returns a canonical identifier and a canonical `https`
//! delivery URL, or fails. A response without a usable identifier counts
//! as a failure.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::config::StorageConfig;
use crate::{AppError, AppResult};

/// Shared handle to the configured storage backend.
pub type MediaStorageService = Arc<dyn MediaStorage>;

/// A successfully stored remote image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImage {
    /// Provider-assigned opaque identifier.
    pub public_id: String,
    /// Canonical absolute `https` delivery URL.
    pub secure_url: String,
}

/// Remote media storage backend.
#[async_trait::async_trait]
pub trait MediaStorage: Send + Sync {
    /// Upload raw file bytes into `folder`.
    async fn upload_bytes(
        &self,
        data: Vec<u8>,
        filename: &str,
        folder: &str,
    ) -> AppResult<RemoteImage>;

    /// Ask the provider to fetch and store the image behind `source_url`.
    async fn upload_url(&self, source_url: &str, folder: &str) -> AppResult<RemoteImage>;
}

/// Upload API response body. Only the fields the system relies on.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: Option<String>,
    secure_url: Option<String>,
}

/// HTTP client for a Cloudinary-style upload API.
pub struct CloudMediaStorage {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    upload_preset: Option<String>,
}

impl CloudMediaStorage {
    /// Build a client from the storage configuration.
    pub fn new(config: &StorageConfig) -> AppResult<Self> {
        if config.cloud_name.is_empty() {
            return Err(AppError::Config(
                "storage.cloud_name is required when storage is enabled".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build upload client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/{}/image/upload",
                config.upload_api.trim_end_matches('/'),
                config.cloud_name
            ),
            api_key: config.api_key.clone(),
            upload_preset: config.upload_preset.clone(),
        })
    }

    fn base_form(&self, folder: &str) -> reqwest::multipart::Form {
        let mut form = reqwest::multipart::Form::new().text("folder", folder.to_string());
        if let Some(ref preset) = self.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }
        if let Some(ref key) = self.api_key {
            form = form.text("api_key", key.clone());
        }
        form
    }

    async fn send(&self, form: reqwest::multipart::Form) -> AppResult<RemoteImage> {
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::MediaStorage(format!("upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::MediaStorage(format!(
                "upload rejected with status {status}"
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::MediaStorage(format!("malformed upload response: {e}")))?;

        match (body.public_id, body.secure_url) {
            (Some(public_id), Some(secure_url)) if !secure_url.is_empty() => Ok(RemoteImage {
                public_id,
                secure_url,
            }),
            _ => Err(AppError::MediaStorage(
                "upload response carried no secure URL".to_string(),
            )),
        }
    }
}

#[async_trait::async_trait]
impl MediaStorage for CloudMediaStorage {
    async fn upload_bytes(
        &self,
        data: Vec<u8>,
        filename: &str,
        folder: &str,
    ) -> AppResult<RemoteImage> {
        let part = reqwest::multipart::Part::bytes(data).file_name(filename.to_string());
        let form = self.base_form(folder).part("file", part);
        self.send(form).await
    }

    async fn upload_url(&self, source_url: &str, folder: &str) -> AppResult<RemoteImage> {
        let form = self.base_form(folder).text("file", source_url.to_string());
        self.send(form).await
    }
}

/// Stand-in backend used when no provider is configured. Every call fails,
/// which the write path surfaces as a field-level client error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMediaStorage;

#[async_trait::async_trait]
impl MediaStorage for NoopMediaStorage {
    async fn upload_bytes(
        &self,
        _data: Vec<u8>,
        _filename: &str,
        _folder: &str,
    ) -> AppResult<RemoteImage> {
        Err(AppError::MediaStorage(
            "media storage is not configured".to_string(),
        ))
    }

    async fn upload_url(&self, _source_url: &str, _folder: &str) -> AppResult<RemoteImage> {
        Err(AppError::MediaStorage(
            "media storage is not configured".to_string(),
        ))
    }
}
