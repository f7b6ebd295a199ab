//! Fetching published files and naming them for saving.

use std::time::Instant;

use bytes::Bytes;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};

use crate::api_types::DownloadableFile;
use crate::client::ApiClient;
use crate::error::ApiError;

const UNAVAILABLE_MESSAGE: &str = "File is not available for download";
const FAILED_MESSAGE: &str = "Failed to download file";
const MAX_URL_EXTENSION_CHARS: usize = 5;

/// Content of a downloaded file plus the name it should be saved under.
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// GET the stored file. No credential is sent; stored URLs are public.
pub async fn download(api: &ApiClient, file: &DownloadableFile) -> Result<FileDownload, ApiError> {
    let raw = file
        .stored_file_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::validation(UNAVAILABLE_MESSAGE))?;
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => api.url(raw)?,
        Err(err) => return Err(err.into()),
    };

    let started_at = Instant::now();
    let response = api.http().get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        warn!(
            target = "download",
            op = "download::fetch",
            file_id = %file.id,
            status = status.as_u16(),
            result = "http_error",
            "File download refused"
        );
        return Err(ApiError::Http {
            status,
            message: FAILED_MESSAGE.to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await?;
    let file_name = download_file_name(
        &file.title,
        &url,
        content_type.as_deref().or(file.mime_type.as_deref()),
    );

    info!(
        target = "download",
        op = "download::fetch",
        file_id = %file.id,
        size_bytes = bytes.len(),
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        result = "ok",
        "File downloaded"
    );
    Ok(FileDownload {
        file_name,
        content_type,
        bytes,
    })
}

/// Name to save a download under: the title plus an extension taken from
/// the URL's last path segment, or from the content type when the URL has
/// no short alphanumeric extension.
pub fn download_file_name(title: &str, url: &Url, content_type: Option<&str>) -> String {
    let stem = sanitize(title);
    let extension = url_extension(url).or_else(|| content_type.and_then(extension_for));
    match extension {
        Some(ext) if !stem.to_ascii_lowercase().ends_with(&format!(".{ext}")) => {
            format!("{stem}.{ext}")
        }
        _ => stem,
    }
}

fn url_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (_, ext) = segment.rsplit_once('.')?;
    let valid = (1..=MAX_URL_EXTENSION_CHARS).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

fn extension_for(content_type: &str) -> Option<String> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let known = match essence.as_str() {
        "application/pdf" => Some("pdf"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "application/vnd.ms-excel" => Some("xls"),
        "application/zip" => Some("zip"),
        "application/octet-stream" | "" => return None,
        _ => None,
    };
    known.map(str::to_string).or_else(|| {
        mime_guess::get_mime_extensions_str(&essence)
            .and_then(|extensions| extensions.first())
            .map(|ext| (*ext).to_string())
    })
}

fn sanitize(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned.to_string()
    }
}
