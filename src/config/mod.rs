//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroU64},
    path::{Path, PathBuf},
    str::FromStr,
};

use clap::{Args, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "newsroom";
const ENV_PREFIX: &str = "NEWSROOM";
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_STATE_DIR: &str = ".newsroom";
const DEFAULT_PAGE_SIZE: u32 = 9;
const DEFAULT_TRANSFORM_THRESHOLD_BYTES: u64 = 1024 * 1024;
const DEFAULT_MAX_DIMENSION: u32 = 1920;
const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Command-line overrides that sit on top of file and environment sources.
#[derive(Debug, Args, Default, Clone)]
pub struct ConfigOverrides {
    /// Override the backend API base URL.
    #[arg(long = "api-base-url", env = "NEWSROOM_API_BASE_URL", value_name = "URL")]
    pub api_base_url: Option<String>,

    /// Override the media host upload endpoint.
    #[arg(long = "assets-endpoint", value_name = "URL")]
    pub assets_endpoint: Option<String>,

    /// Override the media host upload preset.
    #[arg(long = "assets-upload-preset", value_name = "PRESET")]
    pub assets_upload_preset: Option<String>,

    /// Override the directory holding the persisted session.
    #[arg(long = "state-dir", env = "NEWSROOM_STATE_DIR", value_name = "PATH")]
    pub state_dir: Option<PathBuf>,

    /// Override the list page size.
    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<u32>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub assets: AssetSettings,
    pub session: SessionSettings,
    pub pagination: PaginationSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssetSettings {
    /// Unset until deployment supplies one; uploads fail with `Unconfigured`.
    pub endpoint: Option<Url>,
    pub upload_preset: Option<String>,
    /// `None` disables the pre-upload image transform.
    pub transform_threshold_bytes: Option<NonZeroU64>,
    pub max_dimension: NonZeroU32,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct PaginationSettings {
    pub page_size: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        }
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: NonZeroU32::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroU32::MIN),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    assets: RawAssetSettings,
    session: RawSessionSettings,
    pagination: RawPaginationSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = overrides.api_base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(endpoint) = overrides.assets_endpoint.as_ref() {
            self.assets.endpoint = Some(endpoint.clone());
        }
        if let Some(preset) = overrides.assets_upload_preset.as_ref() {
            self.assets.upload_preset = Some(preset.clone());
        }
        if let Some(dir) = overrides.state_dir.as_ref() {
            self.session.state_dir = Some(dir.clone());
        }
        if let Some(size) = overrides.page_size {
            self.pagination.page_size = Some(size);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            assets,
            session,
            pagination,
            logging,
        } = raw;

        Ok(Self {
            api: build_api_settings(api)?,
            assets: build_asset_settings(assets)?,
            session: build_session_settings(session),
            pagination: build_pagination_settings(pagination)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let base = non_blank(api.base_url).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let base_url = parse_http_url(&base, "api.base_url")?;
    let user_agent = non_blank(api.user_agent);

    Ok(ApiSettings {
        base_url,
        user_agent,
    })
}

fn build_asset_settings(assets: RawAssetSettings) -> Result<AssetSettings, LoadError> {
    let endpoint = non_blank(assets.endpoint)
        .map(|value| parse_http_url(&value, "assets.endpoint"))
        .transpose()?;
    let upload_preset = non_blank(assets.upload_preset);

    // zero disables the transform
    let transform_threshold_bytes = NonZeroU64::new(
        assets
            .transform_threshold_bytes
            .unwrap_or(DEFAULT_TRANSFORM_THRESHOLD_BYTES),
    );

    let max_dimension = NonZeroU32::new(assets.max_dimension.unwrap_or(DEFAULT_MAX_DIMENSION))
        .ok_or_else(|| LoadError::invalid("assets.max_dimension", "must be greater than zero"))?;

    let jpeg_quality = assets.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY);
    if !(1..=100).contains(&jpeg_quality) {
        return Err(LoadError::invalid(
            "assets.jpeg_quality",
            "must be between 1 and 100",
        ));
    }

    Ok(AssetSettings {
        endpoint,
        upload_preset,
        transform_threshold_bytes,
        max_dimension,
        jpeg_quality,
    })
}

fn build_session_settings(session: RawSessionSettings) -> SessionSettings {
    SessionSettings {
        state_dir: session
            .state_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
    }
}

fn build_pagination_settings(
    pagination: RawPaginationSettings,
) -> Result<PaginationSettings, LoadError> {
    let page_size = NonZeroU32::new(pagination.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
        .ok_or_else(|| LoadError::invalid("pagination.page_size", "must be greater than zero"))?;
    Ok(PaginationSettings { page_size })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_http_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value).map_err(|err| LoadError::invalid(key, err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{other}`"),
        )),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAssetSettings {
    endpoint: Option<String>,
    upload_preset: Option<String>,
    transform_threshold_bytes: Option<u64>,
    max_dimension: Option<u32>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSessionSettings {
    state_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPaginationSettings {
    page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}
