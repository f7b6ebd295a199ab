use std::time::Instant;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api_types::MessageBody;
use crate::config::ApiSettings;
use crate::error::{ApiError, GENERIC_FAILURE_MESSAGE};
use crate::session::{BearerToken, SessionContext};

/// Which bearer token, if any, accompanies a request.
#[derive(Debug, Clone, Default)]
pub enum Credential {
    /// The token of the current session, omitted when signed out.
    #[default]
    Session,
    /// A token not yet owned by the session (e.g. completing an OAuth login).
    Explicit(BearerToken),
    Anonymous,
}

/// A single backend call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    credential: Credential,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            credential: Credential::Session,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

/// Backend client. Every call is a fresh round-trip: no retries, no caching.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionContext) -> Result<Self, ApiError> {
        let client = Client::builder().user_agent(super::user_agent()).build()?;
        Self::with_client(client, base_url, session)
    }

    /// Client honouring the configured base URL and user agent.
    pub fn from_settings(settings: &ApiSettings, session: SessionContext) -> Result<Self, ApiError> {
        let user_agent = settings
            .user_agent
            .as_deref()
            .unwrap_or(super::user_agent());
        let client = Client::builder().user_agent(user_agent).build()?;
        Self::with_client(client, settings.base_url.as_str(), session)
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        session: SessionContext,
    ) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)?.join("/")?;
        Ok(Self {
            client,
            base,
            session,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(ApiError::Url)
    }

    /// `request(method, path, body?)`: the bearer token of the current
    /// session is attached when present.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;
        self.execute(request).await
    }

    /// Execute and decode the body into `T`.
    pub async fn execute_as<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let value = self.execute(request).await?;
        serde_json::from_value(value).map_err(|err| {
            ApiError::malformed(None, format!("unexpected response shape from {path}: {err}"))
        })
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let ApiRequest {
            method,
            path,
            query,
            body,
            credential,
        } = request;

        let mut url = self.url(&path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &query {
                pairs.append_pair(key, value);
            }
        }

        let mut builder = self.client.request(method.clone(), url);
        if let Some(header) = self.auth_header(&credential)? {
            builder = builder.header(AUTHORIZATION, header);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        self.dispatch(&method, &path, builder).await
    }

    /// POST a multipart form with the session credential.
    pub async fn execute_multipart(&self, path: &str, form: Form) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        let mut builder = self.client.post(url).multipart(form);
        if let Some(header) = self.auth_header(&Credential::Session)? {
            builder = builder.header(AUTHORIZATION, header);
        }
        self.dispatch(&Method::POST, path, builder).await
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<Value, ApiError> {
        let started_at = Instant::now();
        let result = builder.send().await;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    target = "client::api",
                    op = "api::execute",
                    method = %method,
                    path = %path,
                    result = "network_error",
                    elapsed_ms,
                    error = %err,
                    "Request did not complete"
                );
                record_request(method, "network_error", elapsed_ms);
                return Err(ApiError::Network(err));
            }
        };

        let status = response.status();
        let outcome = Self::handle(response).await;
        let result_label = match &outcome {
            Ok(_) => "ok",
            Err(ApiError::Http { .. }) => "http_error",
            Err(ApiError::MalformedResponse { .. }) => "malformed",
            Err(_) => "error",
        };
        debug!(
            target = "client::api",
            op = "api::execute",
            method = %method,
            path = %path,
            status = status.as_u16(),
            result = result_label,
            elapsed_ms,
            "Request completed"
        );
        record_request(method, result_label, elapsed_ms);
        outcome
    }

    /// Header for the chosen credential; `None` when no token applies.
    pub fn auth_header(&self, credential: &Credential) -> Result<Option<HeaderValue>, ApiError> {
        let token = match credential {
            Credential::Session => self.session.token(),
            Credential::Explicit(token) => Some(token.clone()),
            Credential::Anonymous => None,
        };
        token
            .map(|token| {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
                    .map_err(|err| ApiError::validation(format!("invalid bearer token: {err}")))?;
                value.set_sensitive(true);
                Ok(value)
            })
            .transpose()
    }

    /// Require a session token, failing locally with `AuthMissing`.
    pub fn require_token(&self) -> Result<BearerToken, ApiError> {
        self.session.token().ok_or(ApiError::AuthMissing)
    }

    pub(crate) async fn handle(response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(error_from_body(status, &bytes));
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::malformed(Some(status), format!("failed to parse body: {err}")))
    }
}

/// Serialize a request body; only fails for types with non-string map keys.
pub(crate) fn to_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|err| ApiError::validation(format!("failed to encode request: {err}")))
}

fn error_from_body(status: StatusCode, bytes: &[u8]) -> ApiError {
    match serde_json::from_slice::<MessageBody>(bytes) {
        Ok(MessageBody {
            message: Some(message),
        }) if !message.trim().is_empty() => ApiError::Http { status, message },
        Ok(_) => ApiError::malformed(Some(status), "error body carried no message"),
        Err(_) => {
            let preview = String::from_utf8_lossy(&bytes[..bytes.len().min(120)]).into_owned();
            ApiError::malformed(
                Some(status),
                format!("{GENERIC_FAILURE_MESSAGE}; non-JSON error body: {preview}"),
            )
        }
    }
}

fn record_request(method: &Method, result: &'static str, elapsed_ms: u64) {
    metrics::counter!(
        "newsroom_api_request_total",
        "method" => method.to_string(),
        "result" => result
    )
    .increment(1);
    metrics::histogram!("newsroom_api_request_ms", "method" => method.to_string())
        .record(elapsed_ms as f64);
}
