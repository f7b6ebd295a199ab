//! Optional pre-upload transform: shrink large images before sending them to
//! the media host.

use std::fmt;
use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use thiserror::Error;
use tracing::debug;

use super::upload::AssetBlob;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode image: {0}")]
    Encode(String),
    #[error("transform task failed: {0}")]
    Task(String),
}

/// Rewrites a blob before upload. `Ok(None)` means "upload the original".
#[async_trait]
pub trait AssetTransform: Send + Sync + fmt::Debug {
    async fn transform(&self, blob: &AssetBlob) -> Result<Option<AssetBlob>, TransformError>;
}

/// Downscales and recompresses raster images above a size threshold.
#[derive(Debug, Clone, Copy)]
pub struct ImageDownscaler {
    threshold_bytes: u64,
    max_dimension: u32,
    jpeg_quality: u8,
}

impl ImageDownscaler {
    pub fn new(threshold_bytes: u64, max_dimension: u32, jpeg_quality: u8) -> Self {
        Self {
            threshold_bytes,
            max_dimension: max_dimension.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn applies_to(&self, blob: &AssetBlob) -> bool {
        let content_type = blob.content_type();
        content_type.starts_with("image/")
            && !matches!(content_type, "image/svg+xml" | "image/gif")
            && blob.len() as u64 > self.threshold_bytes
    }
}

#[async_trait]
impl AssetTransform for ImageDownscaler {
    async fn transform(&self, blob: &AssetBlob) -> Result<Option<AssetBlob>, TransformError> {
        if !self.applies_to(blob) {
            return Ok(None);
        }

        if let Ok(size) = imagesize::blob_size(blob.bytes()) {
            debug!(
                target = "client::transform",
                op = "transform::downscale",
                width = size.width,
                height = size.height,
                bytes = blob.len(),
                "Downscaling image before upload"
            );
        }

        let source = blob.bytes().clone();
        let settings = *self;
        let encoded = tokio::task::spawn_blocking(move || settings.recompress(&source))
            .await
            .map_err(|err| TransformError::Task(err.to_string()))??;

        if encoded.len() >= blob.len() {
            return Ok(None);
        }

        Ok(Some(AssetBlob::new(
            Bytes::from(encoded),
            jpeg_file_name(blob.file_name()),
            "image/jpeg",
        )))
    }
}

impl ImageDownscaler {
    fn recompress(&self, source: &[u8]) -> Result<Vec<u8>, TransformError> {
        let decoded =
            image::load_from_memory(source).map_err(|err| TransformError::Decode(err.to_string()))?;
        let resized = if decoded.width() > self.max_dimension || decoded.height() > self.max_dimension
        {
            decoded.resize(self.max_dimension, self.max_dimension, FilterType::Triangle)
        } else {
            decoded
        };
        let rgb = resized.to_rgb8();

        let mut out = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut out, self.jpeg_quality)
            .encode_image(&rgb)
            .map_err(|err| TransformError::Encode(err.to_string()))?;
        Ok(out.into_inner())
    }
}

fn jpeg_file_name(original: &str) -> String {
    let stem = original
        .rsplit_once('.')
        .map_or(original, |(stem, _)| stem);
    let stem = if stem.is_empty() { "upload" } else { stem };
    format!("{stem}.jpg")
}
