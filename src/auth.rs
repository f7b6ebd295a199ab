//! Account flows. [`AuthService`] owns the [`SessionStore`]; it is the only
//! place that drives session transitions.

use reqwest::Method;
use tracing::{info, warn};

use crate::api_types::{
    AuthResponse, CurrentUserResponse, ProfileUpdateRequest, Role, SignInRequest, SignUpRequest,
    User,
};
use crate::client::{ApiClient, ApiRequest, AssetBlob, AssetUploader, Credential, to_body};
use crate::error::ApiError;
use crate::navigation::{DashboardTab, Navigation};
use crate::session::{AuthPhase, BearerToken, SessionContext, SessionStore};

const MISSING_FIELDS_MESSAGE: &str = "Please fill out all fields";
const NO_CHANGES_MESSAGE: &str = "No changes made";

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_image: Option<AssetBlob>,
}

/// Profile editor input. Fields equal to the current profile are not sent.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile_image: Option<AssetBlob>,
}

#[derive(Debug)]
pub struct AuthService {
    store: SessionStore,
    api: ApiClient,
    uploader: AssetUploader,
}

impl AuthService {
    /// `api` must have been built from `store.context()`.
    pub fn new(store: SessionStore, api: ApiClient, uploader: AssetUploader) -> Self {
        Self {
            store,
            api,
            uploader,
        }
    }

    pub fn context(&self) -> SessionContext {
        self.store.context()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn uploader(&self) -> &AssetUploader {
        &self.uploader
    }

    /// Finish a session restored from storage.
    ///
    /// A token without a cached profile is completed against `/api/auth/me`;
    /// a token the server rejects is purged.
    pub async fn bootstrap(&mut self) -> Result<AuthPhase, ApiError> {
        let context = self.store.context();
        if context.is_authenticated() {
            return Ok(context.phase());
        }
        let Some(token) = self.store.restored_token().cloned() else {
            return Ok(context.phase());
        };

        match self.complete_oauth(token).await {
            Ok(_) => Ok(self.store.context().phase()),
            Err(err @ ApiError::Http { .. }) => {
                warn!(
                    target = "auth",
                    op = "auth::bootstrap",
                    result = "token_rejected",
                    error = %err,
                    "Stored token rejected; clearing session"
                );
                self.store.sign_out()?;
                Ok(AuthPhase::SignedOut)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Navigation, ApiError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::validation(MISSING_FIELDS_MESSAGE));
        }

        self.store.begin_auth();
        let request = ApiRequest::new(Method::POST, "/api/auth/signin")
            .credential(Credential::Anonymous)
            .json(to_body(&SignInRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?);

        let response: AuthResponse = match self.api.execute_as(request).await {
            Ok(response) => response,
            Err(err) => {
                self.store.auth_failed(err.user_message());
                return Err(err);
            }
        };
        self.establish(response.user, BearerToken::new(response.access_token), "auth::sign_in")
    }

    /// Adopt a token delivered out of band (OAuth redirect).
    pub async fn complete_oauth(&mut self, token: BearerToken) -> Result<Navigation, ApiError> {
        if token.expose().trim().is_empty() {
            return Err(ApiError::validation("Missing access token"));
        }

        self.store.begin_auth();
        let request =
            ApiRequest::get("/api/auth/me").credential(Credential::Explicit(token.clone()));
        let response: CurrentUserResponse = match self.api.execute_as(request).await {
            Ok(response) => response,
            Err(err) => {
                self.store.auth_failed(err.user_message());
                return Err(err);
            }
        };
        self.establish(response.user, token, "auth::complete_oauth")
    }

    pub async fn sign_up(&self, form: SignUpForm) -> Result<Navigation, ApiError> {
        let SignUpForm {
            username,
            email,
            password,
            profile_image,
        } = form;
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::validation(MISSING_FIELDS_MESSAGE));
        }

        let profile_picture_url = match profile_image {
            Some(blob) => Some(self.uploader.upload(blob).await?.into_string()),
            None => None,
        };

        let request = ApiRequest::new(Method::POST, "/api/auth/signup")
            .credential(Credential::Anonymous)
            .json(to_body(&SignUpRequest {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password,
                profile_picture_url,
            })?);
        self.api.execute(request).await?;

        info!(target = "auth", op = "auth::sign_up", result = "ok", "Account created");
        Ok(Navigation::SignIn)
    }

    /// Send only what changed; an empty patch never reaches the server.
    pub async fn update_profile(&self, form: ProfileForm) -> Result<User, ApiError> {
        let session = self.store.context().current().ok_or(ApiError::AuthMissing)?;
        let current = session.user();

        let mut patch = ProfileUpdateRequest {
            username: changed(form.username, &current.username),
            email: changed(form.email, &current.email),
            password: form.password.filter(|password| !password.is_empty()),
            profile_picture_url: None,
        };
        if patch.is_empty() && form.profile_image.is_none() {
            return Err(ApiError::validation(NO_CHANGES_MESSAGE));
        }
        if let Some(blob) = form.profile_image {
            patch.profile_picture_url = Some(self.uploader.upload(blob).await?.into_string());
        }

        let request = ApiRequest::new(Method::PUT, format!("/api/user/update/{}", current.id))
            .json(to_body(&patch)?);
        let response = self.api.execute(request).await?;

        let updated = serde_json::from_value::<User>(response).unwrap_or_else(|_| {
            let mut user = current.clone();
            if let Some(username) = patch.username.clone() {
                user.username = username;
            }
            if let Some(email) = patch.email.clone() {
                user.email = email;
            }
            if let Some(url) = patch.profile_picture_url.clone() {
                user.profile_picture_url = Some(url);
            }
            user
        });
        self.store.profile_updated(updated.clone())?;

        info!(target = "auth", op = "auth::update_profile", result = "ok", "Profile updated");
        Ok(updated)
    }

    /// Tell the backend, then clear the local session whatever it answered.
    pub async fn sign_out(&mut self) -> Result<Navigation, ApiError> {
        if self.store.context().is_authenticated() {
            let request = ApiRequest::new(Method::POST, "/api/user/signout");
            if let Err(err) = self.api.execute(request).await {
                warn!(
                    target = "auth",
                    op = "auth::sign_out",
                    result = "backend_error",
                    error = %err,
                    "Backend sign-out failed; clearing local session anyway"
                );
            }
        }
        self.store.sign_out()?;
        Ok(Navigation::SignIn)
    }

    /// Delete the signed-in account. The session survives a failed delete.
    pub async fn delete_account(&mut self) -> Result<Navigation, ApiError> {
        let session = self.store.context().current().ok_or(ApiError::AuthMissing)?;
        let request =
            ApiRequest::new(Method::DELETE, format!("/api/user/delete/{}", session.user_id()));
        self.api.execute(request).await?;

        self.store.account_deleted()?;
        info!(target = "auth", op = "auth::delete_account", result = "ok", "Account deleted");
        Ok(Navigation::SignIn)
    }

    fn establish(
        &mut self,
        user: User,
        token: BearerToken,
        op: &'static str,
    ) -> Result<Navigation, ApiError> {
        let destination = landing_for(user.role);
        self.store.auth_succeeded(user, token)?;
        info!(target = "auth", op, result = "ok", "Signed in");
        Ok(destination)
    }
}

fn landing_for(role: Role) -> Navigation {
    match role {
        Role::Admin => Navigation::Dashboard(DashboardTab::Dash),
        Role::User => Navigation::Home,
    }
}

fn changed(candidate: Option<String>, current: &str) -> Option<String> {
    candidate
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && value != current)
}
