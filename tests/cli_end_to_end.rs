#![deny(clippy::all, clippy::pedantic)]

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use std::path::Path;
use tempfile::TempDir;

fn cli(server: &MockServer, state_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("newsroom-cli"));
    cmd.env_remove("NEWSROOM_CONFIG_FILE")
        .env_remove("NEWSROOM_PASSWORD")
        .env("NEWSROOM_API_BASE_URL", server.base_url())
        .env("NEWSROOM_STATE_DIR", state_dir)
        .arg("--log-level")
        .arg("warn");
    cmd
}

fn seed_session(state_dir: &Path, role: &str) {
    std::fs::create_dir_all(state_dir).expect("state dir");
    std::fs::write(state_dir.join("access_token"), "cli-token").expect("token");
    std::fs::write(
        state_dir.join("current_user"),
        format!(r#"{{"_id":"u1","username":"sari","email":"sari@example.com","role":"{role}"}}"#),
    )
    .expect("user");
}

fn posts_page() -> &'static str {
    r#"{"posts":[{"_id":"p1","slug":"a","title":"A","category":"nasional","content":"<p>a</p>","image":"https://img/a.jpg","createdAt":"2024-05-01T10:00:00Z"}]}"#
}

#[test]
fn sign_in_then_whoami_uses_the_persisted_session() {
    let server = MockServer::start();
    let signin = server.mock(|when, then| {
        when.method("POST")
            .path("/api/auth/signin")
            .json_body_includes(r#"{"email":"sari@example.com","password":"rahasia"}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"access_token":"cli-token","user":{"_id":"u1","username":"sari","email":"sari@example.com","role":"user"}}"#);
    });
    let state = TempDir::new().expect("state dir");

    cli(&server, state.path())
        .env("NEWSROOM_PASSWORD", "rahasia")
        .args(["auth", "sign-in", "--email", "sari@example.com"])
        .assert()
        .success();
    signin.assert();

    let assert = cli(&server, state.path())
        .args(["auth", "whoami"])
        .assert()
        .success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("\"username\": \"sari\""));
}

#[test]
fn whoami_without_session_fails() {
    let server = MockServer::start();
    let state = TempDir::new().expect("state dir");

    cli(&server, state.path())
        .args(["auth", "whoami"])
        .assert()
        .failure()
        .stderr(contains("AuthMissing"));
}

#[test]
fn declined_delete_sends_no_request() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/posts/getposts");
        then.status(200)
            .header("content-type", "application/json")
            .body(posts_page());
    });
    let delete = server.mock(|when, then| {
        when.method("DELETE").path("/api/posts/deleteposts/p1");
        then.status(200).body(r#"{"message":"deleted"}"#);
    });
    let state = TempDir::new().expect("state dir");
    seed_session(state.path(), "admin");

    cli(&server, state.path())
        .args(["posts", "delete", "p1"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stderr(contains("Cancelled"));
    delete.assert_hits(0);
}

#[test]
fn confirmed_delete_carries_the_stored_token() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/posts/getposts");
        then.status(200)
            .header("content-type", "application/json")
            .body(posts_page());
    });
    let delete = server.mock(|when, then| {
        when.method("DELETE")
            .path("/api/posts/deleteposts/p1")
            .header("authorization", "Bearer cli-token");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"message":"The post has been deleted"}"#);
    });
    let state = TempDir::new().expect("state dir");
    seed_session(state.path(), "admin");

    cli(&server, state.path())
        .args(["--yes", "posts", "delete", "p1"])
        .assert()
        .success();
    delete.assert();
}
