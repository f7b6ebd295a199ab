#![deny(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use newsroom::auth::AuthService;
use newsroom::client::{ApiClient, AssetUploader};
use newsroom::config::{LoadError, Settings};
use newsroom::error::{ApiError, StorageError, UploadError};
use newsroom::session::{FileStore, KeyValueStore, SessionStore};
use newsroom::telemetry::TelemetryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("session storage: {0}")]
    Storage(#[from] StorageError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("{}", .0.user_message())]
    Upload(#[from] UploadError),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to render output: {0}")]
    Output(String),
}

/// Everything a handler needs: the account service (which owns the session
/// store), a backend client bound to that session, and the media uploader.
#[derive(Debug)]
pub struct Ctx {
    pub auth: AuthService,
    pub api: ApiClient,
    pub uploader: AssetUploader,
    pub settings: Settings,
    pub assume_yes: bool,
}

impl Ctx {
    pub fn new(
        settings: Settings,
        storage: Arc<dyn KeyValueStore>,
        assume_yes: bool,
    ) -> Result<Self, CliError> {
        let store = SessionStore::restore(storage)?;
        let api = ApiClient::from_settings(&settings.api, store.context())?;
        let uploader = AssetUploader::from_settings(api.http().clone(), &settings.assets);
        let auth = AuthService::new(store, api.clone(), uploader.clone());
        Ok(Self {
            auth,
            api,
            uploader,
            settings,
            assume_yes,
        })
    }

    pub fn page_size(&self) -> std::num::NonZeroU32 {
        self.settings.pagination.page_size
    }
}

pub fn build_ctx(settings: Settings, assume_yes: bool) -> Result<Ctx, CliError> {
    let storage = FileStore::open(settings.session.state_dir.clone())?;
    Ctx::new(settings, Arc::new(storage), assume_yes)
}
