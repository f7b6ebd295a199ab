//! Session store: the single writer of the signed-in identity and its
//! bearer token, plus the read-only context handed to every controller.

mod claims;
mod storage;

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::api_types::{ObjectId, Role, User};
use crate::error::StorageError;
use crate::lock::{rw_read, rw_write};

pub use claims::{TokenHints, decode_hints};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

/// Storage key holding the raw bearer token.
pub const TOKEN_KEY: &str = "access_token";
/// Storage key holding the cached profile of the signed-in user.
pub const USER_KEY: &str = "current_user";

/// Opaque credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Unverified claims carried by the token, if it is JWT-shaped.
    pub fn hints(&self) -> Option<TokenHints> {
        decode_hints(&self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Signed-in identity. A session always carries both a user and a token.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    user: User,
    token: BearerToken,
}

impl Session {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> &ObjectId {
        &self.user.id
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn profile_image_url(&self) -> Option<&str> {
        self.user.profile_picture_url.as_deref()
    }

    pub fn token(&self) -> &BearerToken {
        &self.token
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    SignedOut,
    Authenticating,
    Authenticated,
    Failed(String),
}

#[derive(Debug, Default)]
struct SessionState {
    phase: AuthPhase,
    session: Option<Session>,
}

/// Read-only view of the session shared with clients and controllers.
#[derive(Debug, Clone)]
pub struct SessionContext {
    state: Arc<RwLock<SessionState>>,
}

impl SessionContext {
    /// A context that never has a session; for anonymous public browsing.
    pub fn anonymous() -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
        }
    }

    pub fn current(&self) -> Option<Session> {
        rw_read(&self.state, "session", "current").session.clone()
    }

    pub fn token(&self) -> Option<BearerToken> {
        rw_read(&self.state, "session", "token")
            .session
            .as_ref()
            .map(|session| session.token.clone())
    }

    pub fn phase(&self) -> AuthPhase {
        rw_read(&self.state, "session", "phase").phase.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        rw_read(&self.state, "session", "is_authenticated")
            .session
            .is_some()
    }

    pub fn is_admin(&self) -> bool {
        rw_read(&self.state, "session", "is_admin")
            .session
            .as_ref()
            .is_some_and(|session| session.user.role == Role::Admin)
    }
}

/// Owner of session state and its durable mirror. Not `Clone`: there is
/// exactly one writer; everyone else holds a [`SessionContext`].
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
    storage: Arc<dyn KeyValueStore>,
    restored_token: Option<BearerToken>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("phase", &rw_read(&self.state, "session", "debug").phase)
            .field("restored_token", &self.restored_token.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Bootstrap from durable storage.
    ///
    /// Token and cached profile together restore an authenticated session.
    /// A token without a profile is kept aside for [`Self::restored_token`]
    /// so the caller can complete it against the backend. A profile without a
    /// token is purged.
    pub fn restore(storage: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let token = storage
            .get(TOKEN_KEY)?
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(BearerToken::new);
        let user = match storage.get(USER_KEY)? {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!(
                        target = "session",
                        op = "session::restore",
                        result = "profile_unreadable",
                        error = %err,
                        "Discarding unreadable cached profile"
                    );
                    storage.remove(USER_KEY)?;
                    None
                }
            },
            None => None,
        };

        let mut state = SessionState::default();
        let mut restored_token = None;
        match (token, user) {
            (Some(token), Some(user)) => {
                state.phase = AuthPhase::Authenticated;
                state.session = Some(Session { user, token });
            }
            (Some(token), None) => restored_token = Some(token),
            (None, Some(_)) => storage.remove(USER_KEY)?,
            (None, None) => {}
        }

        info!(
            target = "session",
            op = "session::restore",
            authenticated = state.session.is_some(),
            pending_token = restored_token.is_some(),
            "Session restored from storage"
        );

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            storage,
            restored_token,
        })
    }

    pub fn context(&self) -> SessionContext {
        SessionContext {
            state: Arc::clone(&self.state),
        }
    }

    /// Token found in storage without a cached profile.
    pub fn restored_token(&self) -> Option<&BearerToken> {
        self.restored_token.as_ref()
    }

    pub fn begin_auth(&self) {
        let mut state = rw_write(&self.state, "session", "begin_auth");
        state.phase = AuthPhase::Authenticating;
    }

    /// Persist the credentials, then publish the session.
    ///
    /// If persisting fails nothing is published and storage is left without
    /// a token.
    pub fn auth_succeeded(&mut self, user: User, token: BearerToken) -> Result<(), StorageError> {
        if let Err(err) = self.persist(&user, &token) {
            if let Err(cleanup) = self.storage.remove(TOKEN_KEY) {
                warn!(
                    target = "session",
                    op = "session::auth_succeeded",
                    result = "storage_error",
                    error = %cleanup,
                    "Token left in storage after a failed persist"
                );
            }
            let mut state = rw_write(&self.state, "session", "auth_succeeded");
            state.phase = AuthPhase::Failed(err.to_string());
            return Err(err);
        }

        self.restored_token = None;
        let mut state = rw_write(&self.state, "session", "auth_succeeded");
        state.phase = AuthPhase::Authenticated;
        state.session = Some(Session { user, token });
        info!(
            target = "session",
            op = "session::auth_succeeded",
            result = "ok",
            "Session established"
        );
        Ok(())
    }

    pub fn auth_failed(&self, reason: impl Into<String>) {
        let mut state = rw_write(&self.state, "session", "auth_failed");
        state.phase = AuthPhase::Failed(reason.into());
    }

    /// Replace the cached profile of the current session.
    pub fn profile_updated(&self, user: User) -> Result<(), StorageError> {
        let mut state = rw_write(&self.state, "session", "profile_updated");
        let Some(session) = state.session.as_mut() else {
            return Ok(());
        };
        let encoded = serde_json::to_string(&user).map_err(|source| StorageError::Encode {
            key: USER_KEY,
            source,
        })?;
        self.storage.set(USER_KEY, &encoded)?;
        session.user = user;
        Ok(())
    }

    pub fn sign_out(&mut self) -> Result<(), StorageError> {
        self.purge("session::sign_out")
    }

    pub fn account_deleted(&mut self) -> Result<(), StorageError> {
        self.purge("session::account_deleted")
    }

    fn persist(&self, user: &User, token: &BearerToken) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(user).map_err(|source| StorageError::Encode {
            key: USER_KEY,
            source,
        })?;
        self.storage.set(TOKEN_KEY, token.expose())?;
        self.storage.set(USER_KEY, &encoded)?;
        Ok(())
    }

    fn purge(&mut self, op: &'static str) -> Result<(), StorageError> {
        let token_result = self.storage.remove(TOKEN_KEY);
        let user_result = self.storage.remove(USER_KEY);

        self.restored_token = None;
        {
            let mut state = rw_write(&self.state, "session", op);
            state.phase = AuthPhase::SignedOut;
            state.session = None;
        }

        match token_result.and(user_result) {
            Ok(()) => {
                info!(target = "session", op, result = "ok", "Session cleared");
                Ok(())
            }
            Err(err) => {
                warn!(
                    target = "session",
                    op,
                    result = "storage_error",
                    error = %err,
                    "Session cleared in memory but storage purge failed"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_user(id: &str, role: Role) -> User {
    User {
        id: ObjectId::new(id),
        username: format!("user-{id}"),
        email: format!("{id}@example.com"),
        role,
        profile_picture_url: None,
        created_at: None,
    }
}
