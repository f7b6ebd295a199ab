use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use tracing::{info, warn};

use crate::api_types::UploadHostResponse;
use crate::config::AssetSettings;
use crate::error::UploadError;

use super::transform::{AssetTransform, ImageDownscaler};

/// Binary payload with the metadata a multipart part needs.
#[derive(Clone, PartialEq, Eq)]
pub struct AssetBlob {
    bytes: Bytes,
    file_name: String,
    content_type: String,
}

impl fmt::Debug for AssetBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetBlob")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl AssetBlob {
    pub fn new(
        bytes: impl Into<Bytes>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    /// Read a file, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, std::io::Error> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(data, file_name, content_type))
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn into_part(self) -> Result<Part, reqwest::Error> {
        Part::bytes(self.bytes.to_vec())
            .file_name(self.file_name)
            .mime_str(&self.content_type)
    }
}

/// URL under which the media host serves an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrl(String);

impl PublicUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PublicUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client for the third-party media host.
#[derive(Debug, Clone)]
pub struct AssetUploader {
    client: Client,
    endpoint: Option<Url>,
    upload_preset: Option<String>,
    transform: Option<Arc<dyn AssetTransform>>,
}

impl AssetUploader {
    /// Build from settings; the image downscaler is enabled when a
    /// threshold is configured.
    pub fn from_settings(client: Client, settings: &AssetSettings) -> Self {
        let uploader = Self::new(
            client,
            settings.endpoint.clone(),
            settings.upload_preset.clone(),
        );
        match settings.transform_threshold_bytes {
            Some(threshold) => uploader.with_transform(Arc::new(ImageDownscaler::new(
                threshold.get(),
                settings.max_dimension.get(),
                settings.jpeg_quality,
            ))),
            None => uploader,
        }
    }

    pub fn new(client: Client, endpoint: Option<Url>, upload_preset: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            upload_preset,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Arc<dyn AssetTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.upload_preset.is_some()
    }

    /// Upload a blob and return its public URL.
    ///
    /// Success requires a `secure_url` in the body; a 2xx status alone is not
    /// enough.
    pub async fn upload(&self, blob: AssetBlob) -> Result<PublicUrl, UploadError> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or(UploadError::Unconfigured("assets.endpoint"))?;
        let preset = self
            .upload_preset
            .clone()
            .ok_or(UploadError::Unconfigured("assets.upload_preset"))?;

        let blob = self.prepare(blob).await;
        let file_name = blob.file_name().to_string();
        let form = Form::new()
            .text("upload_preset", preset)
            .part("file", blob.into_part()?);

        let started_at = Instant::now();
        let response = self.client.post(endpoint).multipart(form).send().await;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    target = "client::upload",
                    op = "upload::send",
                    result = "network_error",
                    elapsed_ms,
                    error = %err,
                    "Asset upload did not complete"
                );
                record_upload("network_error");
                return Err(UploadError::Network(err));
            }
        };

        let status = response.status();
        let bytes = response.bytes().await?;
        let outcome = interpret(status, &bytes);
        match &outcome {
            Ok(url) => {
                info!(
                    target = "client::upload",
                    op = "upload::send",
                    result = "ok",
                    elapsed_ms,
                    file_name = %file_name,
                    url = %url,
                    "Asset uploaded"
                );
                record_upload("ok");
            }
            Err(err) => {
                warn!(
                    target = "client::upload",
                    op = "upload::send",
                    result = "rejected",
                    status = status.as_u16(),
                    elapsed_ms,
                    error = %err,
                    "Asset host did not return a public URL"
                );
                record_upload("rejected");
            }
        }
        outcome
    }

    async fn prepare(&self, blob: AssetBlob) -> AssetBlob {
        let Some(transform) = self.transform.as_ref() else {
            return blob;
        };
        match transform.transform(&blob).await {
            Ok(Some(rewritten)) => {
                info!(
                    target = "client::upload",
                    op = "upload::transform",
                    before_bytes = blob.len(),
                    after_bytes = rewritten.len(),
                    "Image recompressed before upload"
                );
                rewritten
            }
            Ok(None) => blob,
            Err(err) => {
                warn!(
                    target = "client::upload",
                    op = "upload::transform",
                    result = "fallback_original",
                    error = %err,
                    "Pre-upload transform failed; uploading original"
                );
                blob
            }
        }
    }
}

fn interpret(status: reqwest::StatusCode, bytes: &[u8]) -> Result<PublicUrl, UploadError> {
    let body: UploadHostResponse = match serde_json::from_slice(bytes) {
        Ok(body) => body,
        Err(err) if status.is_success() => {
            return Err(UploadError::Malformed {
                status,
                detail: err.to_string(),
            });
        }
        Err(_) => {
            return Err(UploadError::Rejected {
                status,
                message: format!("upload failed with status {status}"),
            });
        }
    };

    let host_message = body.error.and_then(|error| error.message);
    match body.secure_url.filter(|url| !url.trim().is_empty()) {
        Some(url) if status.is_success() && host_message.is_none() => Ok(PublicUrl(url)),
        _ => match host_message {
            Some(message) => Err(UploadError::Rejected { status, message }),
            None if !status.is_success() => Err(UploadError::Rejected {
                status,
                message: format!("upload failed with status {status}"),
            }),
            None => Err(UploadError::MissingUrl { status }),
        },
    }
}

fn record_upload(result: &'static str) {
    metrics::counter!("newsroom_upload_total", "result" => result).increment(1);
}
