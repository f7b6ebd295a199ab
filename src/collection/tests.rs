use std::num::NonZeroU32;

use httpmock::prelude::*;
use serde_json::json;

use super::*;
use crate::api_types::{Article, Category, Role, Slug, User};
use crate::session::SessionContext;

fn page_size(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("non-zero")
}

fn user(id: &str, role: &str) -> Value {
    json!({"_id": id, "username": id, "email": format!("{id}@example.com"), "role": role})
}

fn api(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.base_url(), SessionContext::anonymous()).expect("client")
}

#[test]
fn post_scope_maps_to_query_parameters() {
    let scope = PostScope {
        author: Some(ObjectId::new("u1")),
        category: Some(Category::Teknologi),
    };
    let request = Posts::list_request(&scope, 18, page_size(9));

    assert_eq!(request.path(), "/api/posts/getposts");
    let pairs: Vec<(&str, &str)> = request
        .query_pairs()
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    assert!(pairs.contains(&("startIndex", "18")));
    assert!(pairs.contains(&("limit", "9")));
    assert!(pairs.contains(&("userId", "u1")));
    assert!(pairs.contains(&("category", "teknologi")));
}

#[test]
fn article_comments_use_the_slug_endpoint() {
    let scope = CommentScope {
        post_slug: Some(Slug::new("banjir")),
    };
    let request = Comments::list_request(&scope, 0, page_size(9));
    assert_eq!(request.path(), "/api/comments/getPostComments/banjir");
}

#[test]
fn comment_pages_accept_envelope_or_array() {
    let comment = json!({
        "_id": "c1", "postId": "p1", "userId": "u1", "content": "hi",
        "createdAt": "2024-05-01T10:00:00Z"
    });
    let from_array = Comments::decode_page(json!([comment.clone()])).expect("array");
    let from_envelope = Comments::decode_page(json!({"comments": [comment]})).expect("envelope");
    assert_eq!(from_array, from_envelope);
}

#[tokio::test]
async fn unknown_ids_fail_validation_without_requests() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/getusers");
            then.status(200)
                .json_body(json!({"users": [user("u1", "user")]}));
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE);
            then.status(200);
        })
        .await;

    let users = RemoteCollection::<Users>::new(api(&server), page_size(9));
    users.fetch(()).await.expect("fetch");
    list.assert_async().await;

    let missing = ObjectId::new("nope");
    assert!(matches!(
        users.request_delete(&missing),
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(users.begin_edit(&missing), Err(ApiError::Validation(_))));
    assert!(matches!(
        users.confirm_delete().await,
        Err(ApiError::Validation(_))
    ));
    delete.assert_hits_async(0).await;
}

#[tokio::test]
async fn files_never_offer_more_pages() {
    let server = MockServer::start_async().await;
    let files: Vec<Value> = (0..12)
        .map(|i| json!({"_id": format!("f{i}"), "title": format!("file {i}"), "size": 10}))
        .collect();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/unduhan/published");
            then.status(200).json_body(Value::Array(files));
        })
        .await;

    let collection = RemoteCollection::<Files>::new(api(&server), page_size(9));
    let outcome = collection
        .fetch(FileScope { published: true })
        .await
        .expect("fetch");

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(collection.items().len(), 12);
    assert!(!collection.has_more());
    assert_eq!(collection.load_more().await.expect("skip"), Outcome::Skipped);
}

#[tokio::test]
async fn failed_fetch_is_terminal_until_retried() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/getusers");
            then.status(500).body("<html>oops</html>");
        })
        .await;

    let users = RemoteCollection::<Users>::new(api(&server), page_size(9));
    let err = users.fetch(()).await.expect_err("server error");

    assert!(matches!(err, ApiError::MalformedResponse { .. }));
    assert_eq!(
        users.phase(),
        LoadPhase::Failed(crate::error::GENERIC_FAILURE_MESSAGE.to_string())
    );
    assert!(users.items().is_empty());
}

#[tokio::test]
async fn role_edit_falls_back_to_the_patch_when_body_is_a_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/getusers");
            then.status(200)
                .json_body(json!({"users": [user("u1", "user"), user("u2", "user")]}));
        })
        .await;
    let update = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/user/update-role/u2")
                .json_body(json!({"role": "admin"}));
            then.status(200).json_body(json!({"message": "Role updated"}));
        })
        .await;

    let users = RemoteCollection::<Users>::new(api(&server), page_size(9));
    users.fetch(()).await.expect("fetch");

    let id = ObjectId::new("u2");
    let mut draft = users.begin_edit(&id).expect("draft");
    draft.role = Role::Admin;
    users.commit_edit(&id, draft).await.expect("commit");
    update.assert_async().await;

    let items = users.items();
    assert_eq!(items[0].role, Role::User);
    assert_eq!(items[1].id, id);
    assert_eq!(items[1].role, Role::Admin);
    assert!(users.snapshot().editing.is_none());
}

#[tokio::test]
async fn unmounted_collections_ignore_late_responses() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/getusers");
            then.status(200)
                .delay(std::time::Duration::from_millis(300))
                .json_body(json!({"users": [user("u1", "user")]}));
        })
        .await;

    let users = RemoteCollection::<Users>::new(api(&server), page_size(9));
    let (outcome, ()) = tokio::join!(users.fetch(()), async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        users.unmount();
    });

    assert_eq!(outcome.expect("cancelled is not an error"), Outcome::Cancelled);
    assert!(users.items().is_empty());
    assert_eq!(users.phase(), LoadPhase::Loading);
    assert_eq!(users.fetch(()).await.expect("dead"), Outcome::Cancelled);
}

fn decoded_user(id: &str) -> User {
    serde_json::from_value(user(id, "user")).expect("user")
}

#[test]
fn post_scope_admits_only_matching_articles() {
    let article: Article = serde_json::from_value(json!({
        "_id": "p1", "slug": "p1", "title": "P1", "category": "politik",
        "userId": "u1", "createdAt": "2024-05-01T10:00:00Z"
    }))
    .expect("article");

    assert!(Posts::admits(&PostScope::default(), &article));
    assert!(Posts::admits(
        &PostScope {
            author: Some(ObjectId::new("u1")),
            category: Some(Category::Politik),
        },
        &article
    ));
    assert!(!Posts::admits(
        &PostScope {
            author: None,
            category: Some(Category::Teknologi),
        },
        &article
    ));
    assert!(!Posts::admits(
        &PostScope {
            author: Some(ObjectId::new("u2")),
            category: None,
        },
        &article
    ));
}

#[tokio::test]
async fn create_before_any_fetch_leaves_the_list_alone() {
    let server = MockServer::start_async().await;
    let users = RemoteCollection::<Users>::new(api(&server), page_size(9));

    let (created, outcome) = users
        .create(async { Ok(decoded_user("u9")) })
        .await
        .expect("create");

    assert_eq!(created.id.as_str(), "u9");
    assert_eq!(outcome, Outcome::Skipped);
    assert!(users.items().is_empty());
    assert_eq!(users.notice(), Some(Notice::Success("user created".into())));
}

#[tokio::test]
async fn create_overtaken_by_a_refetch_is_not_inserted() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/getusers");
            then.status(200)
                .json_body(json!({"users": [user("u1", "user")]}));
        })
        .await;

    let users = RemoteCollection::<Users>::new(api(&server), page_size(9));
    users.fetch(()).await.expect("fetch");

    let slow_create = async {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        Ok(decoded_user("u9"))
    };
    let (created, refetched) = tokio::join!(users.create(slow_create), async {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        users.fetch(()).await
    });

    assert_eq!(refetched.expect("refetch"), Outcome::Applied);
    let (_, outcome) = created.expect("create");
    assert_eq!(outcome, Outcome::Superseded);
    let ids: Vec<String> = users.items().iter().map(|u| u.id.to_string()).collect();
    assert_eq!(ids, vec!["u1"]);
}

#[tokio::test]
async fn unmount_during_create_reports_cancellation() {
    let server = MockServer::start_async().await;
    let users = RemoteCollection::<Users>::new(api(&server), page_size(9));

    let slow_create = async {
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        Ok(decoded_user("u9"))
    };
    let (result, ()) = tokio::join!(users.create(slow_create), async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        users.unmount();
    });

    assert!(matches!(result, Err(ApiError::Cancelled)));
    assert!(users.notice().is_none());
}

#[tokio::test]
async fn page_overlapping_a_created_entry_is_not_duplicated() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/user/getusers")
                .query_param("startIndex", "0");
            then.status(200)
                .json_body(json!({"users": [user("u1", "user"), user("u2", "user")]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/user/getusers")
                .query_param("startIndex", "3");
            then.status(200)
                .json_body(json!({"users": [user("u2", "user"), user("u3", "user")]}));
        })
        .await;

    let users = RemoteCollection::<Users>::new(api(&server), page_size(2));
    users.fetch(()).await.expect("fetch");
    let (_, outcome) = users
        .create(async { Ok(decoded_user("u0")) })
        .await
        .expect("create");
    assert_eq!(outcome, Outcome::Applied);

    users.load_more().await.expect("more");
    let ids: Vec<String> = users.items().iter().map(|u| u.id.to_string()).collect();
    assert_eq!(ids, vec!["u0", "u1", "u2", "u3"]);
}
