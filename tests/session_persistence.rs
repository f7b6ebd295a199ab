use std::sync::Arc;

use httpmock::prelude::*;
use newsroom::api_types::Role;
use newsroom::auth::AuthService;
use newsroom::client::{ApiClient, AssetUploader};
use newsroom::navigation::{DashboardTab, Navigation};
use newsroom::session::{AuthPhase, FileStore, KeyValueStore, SessionStore, TOKEN_KEY, USER_KEY};
use serde_json::json;
use tempfile::TempDir;

fn service(server: &MockServer, storage: Arc<dyn KeyValueStore>) -> AuthService {
    let store = SessionStore::restore(storage).expect("restore");
    let api = ApiClient::new(&server.base_url(), store.context()).expect("client");
    let uploader = AssetUploader::new(reqwest::Client::new(), None, None);
    AuthService::new(store, api, uploader)
}

fn user(role: &str) -> serde_json::Value {
    json!({"_id": "u1", "username": "sari", "email": "sari@example.com", "role": role})
}

#[tokio::test]
async fn sign_in_survives_a_restart() {
    let server = MockServer::start_async().await;
    let signin = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/auth/signin")
                .header_missing("authorization")
                .json_body(json!({"email": "sari@example.com", "password": "rahasia"}));
            then.status(200)
                .json_body(json!({"access_token": "tok-1", "user": user("admin")}));
        })
        .await;
    let dir = TempDir::new().expect("tempdir");

    let mut auth = service(&server, Arc::new(FileStore::open(dir.path()).expect("open")));
    let landing = auth.sign_in("sari@example.com", "rahasia").await.expect("sign in");
    signin.assert_async().await;
    assert_eq!(landing, Navigation::Dashboard(DashboardTab::Dash));
    drop(auth);

    let reopened = FileStore::open(dir.path()).expect("reopen");
    assert_eq!(reopened.get(TOKEN_KEY).expect("get").as_deref(), Some("tok-1"));

    let store = SessionStore::restore(Arc::new(reopened)).expect("restore");
    let context = store.context();
    assert_eq!(context.phase(), AuthPhase::Authenticated);
    assert!(context.is_admin());
    let session = context.current().expect("session");
    assert_eq!(session.user_id().as_str(), "u1");
    assert_eq!(session.token().expose(), "tok-1");
}

#[tokio::test]
async fn failed_sign_in_keeps_storage_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/signin");
            then.status(400).json_body(json!({"message": "Invalid password"}));
        })
        .await;
    let dir = TempDir::new().expect("tempdir");
    let storage = Arc::new(FileStore::open(dir.path()).expect("open"));

    let mut auth = service(&server, storage.clone());
    let err = auth.sign_in("sari@example.com", "salah").await.expect_err("rejected");

    assert_eq!(err.user_message(), "Invalid password");
    assert_eq!(auth.context().phase(), AuthPhase::Failed("Invalid password".into()));
    assert!(storage.get(TOKEN_KEY).expect("get").is_none());
    assert!(storage.get(USER_KEY).expect("get").is_none());
}

#[tokio::test]
async fn token_without_profile_is_completed_on_bootstrap() {
    let server = MockServer::start_async().await;
    let me = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/auth/me")
                .header("authorization", "Bearer oauth-tok");
            then.status(200).json_body(json!({"user": user("user")}));
        })
        .await;
    let dir = TempDir::new().expect("tempdir");
    let storage = Arc::new(FileStore::open(dir.path()).expect("open"));
    storage.set(TOKEN_KEY, "oauth-tok").expect("seed");

    let mut auth = service(&server, storage.clone());
    assert_eq!(auth.context().phase(), AuthPhase::SignedOut);
    let phase = auth.bootstrap().await.expect("bootstrap");

    me.assert_async().await;
    assert_eq!(phase, AuthPhase::Authenticated);
    assert_eq!(
        auth.context().current().expect("session").role(),
        Role::User
    );
    assert!(storage.get(USER_KEY).expect("get").is_some());
}

#[tokio::test]
async fn rejected_stored_token_is_purged() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/auth/me");
            then.status(401).json_body(json!({"message": "Unauthorized"}));
        })
        .await;
    let dir = TempDir::new().expect("tempdir");
    let storage = Arc::new(FileStore::open(dir.path()).expect("open"));
    storage.set(TOKEN_KEY, "expired").expect("seed");

    let mut auth = service(&server, storage.clone());
    let phase = auth.bootstrap().await.expect("bootstrap");

    assert_eq!(phase, AuthPhase::SignedOut);
    assert!(!auth.context().is_authenticated());
    assert!(storage.get(TOKEN_KEY).expect("get").is_none());
}

#[tokio::test]
async fn sign_out_clears_storage_even_when_backend_fails() {
    let server = MockServer::start_async().await;
    let signout = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/user/signout")
                .header("authorization", "Bearer tok-1");
            then.status(500).body("boom");
        })
        .await;
    let dir = TempDir::new().expect("tempdir");
    let storage = Arc::new(FileStore::open(dir.path()).expect("open"));
    storage.set(TOKEN_KEY, "tok-1").expect("seed token");
    storage.set(USER_KEY, &user("user").to_string()).expect("seed user");

    let mut auth = service(&server, storage.clone());
    assert!(auth.context().is_authenticated());
    let next = auth.sign_out().await.expect("sign out");

    signout.assert_async().await;
    assert_eq!(next, Navigation::SignIn);
    assert!(!auth.context().is_authenticated());
    assert!(storage.get(TOKEN_KEY).expect("get").is_none());
    assert!(storage.get(USER_KEY).expect("get").is_none());
}

#[tokio::test]
async fn failed_account_deletion_keeps_the_session() {
    let server = MockServer::start_async().await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/user/delete/u1");
            then.status(403).json_body(json!({"message": "Forbidden"}));
        })
        .await;
    let dir = TempDir::new().expect("tempdir");
    let storage = Arc::new(FileStore::open(dir.path()).expect("open"));
    storage.set(TOKEN_KEY, "tok-1").expect("seed token");
    storage.set(USER_KEY, &user("user").to_string()).expect("seed user");

    let mut auth = service(&server, storage.clone());
    auth.delete_account().await.expect_err("forbidden");

    delete.assert_async().await;
    assert!(auth.context().is_authenticated());
    assert_eq!(storage.get(TOKEN_KEY).expect("get").as_deref(), Some("tok-1"));
}
