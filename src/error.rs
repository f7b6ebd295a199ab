use reqwest::StatusCode;
use thiserror::Error;

/// Message shown for failures the user cannot act on (transport errors and
/// unreadable responses).
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong, please try again";

const AUTH_MISSING_MESSAGE: &str = "You need to sign in first";

/// Failure of a call through the authenticated API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (connect, TLS, timeout, body read).
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx response carrying a JSON `message`.
    #[error("server responded {status}: {message}")]
    Http { status: StatusCode, message: String },
    /// Body was not valid JSON or lacked an expected field.
    #[error("malformed response: {detail}")]
    MalformedResponse {
        status: Option<StatusCode>,
        detail: String,
    },
    /// The operation needs a bearer token and none is present.
    #[error("not signed in")]
    AuthMissing,
    /// A client-side check failed before any request was issued.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The owning view went away before the request completed.
    #[error("request cancelled before it completed")]
    Cancelled,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn malformed(status: Option<StatusCode>, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            status,
            detail: detail.into(),
        }
    }

    /// Status code reported by the server, when a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::MalformedResponse { status, .. } => *status,
            ApiError::Network(err) => err.status(),
            _ => None,
        }
    }

    /// Text suitable for showing to the person who triggered the action.
    ///
    /// Server messages pass through verbatim; transport and decoding failures
    /// collapse to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Validation(message) => message.clone(),
            ApiError::AuthMissing => AUTH_MISSING_MESSAGE.to_string(),
            ApiError::Upload(err) => err.user_message(),
            ApiError::Network(_)
            | ApiError::MalformedResponse { .. }
            | ApiError::Cancelled
            | ApiError::Storage(_)
            | ApiError::Url(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Failure of an upload to the third-party media host.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("asset host is not configured ({0})")]
    Unconfigured(&'static str),
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),
    #[error("asset host rejected upload ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("asset host responded {status} without a secure_url")]
    MissingUrl { status: StatusCode },
    #[error("malformed asset host response ({status}): {detail}")]
    Malformed { status: StatusCode, detail: String },
    #[error("failed to read asset: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn user_message(&self) -> String {
        match self {
            UploadError::Rejected { message, .. } => message.clone(),
            _ => "Failed to upload image".to_string(),
        }
    }
}

/// Failure of the durable key-value storage backing the session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored value for `{key}` is unreadable: {source}")]
    Decode {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        key: &'static str,
        source: serde_json::Error,
    },
}
