use std::num::NonZeroU32;
use std::time::Duration;

use httpmock::prelude::*;
use newsroom::api_types::{Category, ObjectId};
use newsroom::client::{ApiClient, AssetBlob, AssetUploader};
use newsroom::collection::{
    Comments, CommentScope, LoadPhase, Notice, Outcome, PostScope, Posts, RemoteCollection,
};
use newsroom::error::ApiError;
use newsroom::session::SessionContext;
use reqwest::Url;
use serde_json::{Value, json};

fn article(id: &str, category: &str) -> Value {
    json!({
        "_id": id,
        "slug": format!("slug-{id}"),
        "title": format!("Title {id}"),
        "category": category,
        "content": format!("<p>{id}</p>"),
        "image": format!("https://img.example/{id}.jpg"),
        "userId": "author-1",
        "createdAt": "2024-05-01T10:00:00Z",
        "updatedAt": "2024-05-02T10:00:00Z"
    })
}

fn posts(server: &MockServer, page_size: u32) -> RemoteCollection<Posts> {
    let api = ApiClient::new(&server.base_url(), SessionContext::anonymous()).expect("client");
    RemoteCollection::new(api, NonZeroU32::new(page_size).expect("non-zero"))
}

async fn seeded(server: &MockServer) -> RemoteCollection<Posts> {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/posts/getposts");
            then.status(200).json_body(json!({"posts": [
                article("p1", "nasional"),
                article("p2", "nasional"),
                article("p3", "nasional")
            ]}));
        })
        .await;
    let collection = posts(server, 9);
    collection.fetch(PostScope::default()).await.expect("fetch");
    collection
}

fn ids(collection: &RemoteCollection<Posts>) -> Vec<String> {
    collection
        .items()
        .iter()
        .map(|item| item.id.as_str().to_string())
        .collect()
}

#[tokio::test]
async fn successful_delete_removes_exactly_one_entity() {
    let server = MockServer::start_async().await;
    let collection = seeded(&server).await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/posts/deleteposts/p2");
            then.status(200).json_body(json!({"message": "The post has been deleted"}));
        })
        .await;
    let before = collection.items();

    let target = ObjectId::new("p2");
    collection.request_delete(&target).expect("known id");
    let outcome = collection.confirm_delete().await.expect("delete");

    assert_eq!(outcome, Outcome::Applied);
    delete.assert_async().await;
    let after = collection.items();
    assert_eq!(ids(&collection), ["p1", "p3"]);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], before[2]);
    assert_eq!(
        collection.notice(),
        Some(Notice::Success("The post has been deleted".to_string()))
    );
}

#[tokio::test]
async fn rejected_delete_leaves_the_collection_untouched() {
    let server = MockServer::start_async().await;
    let collection = seeded(&server).await;
    server
        .mock_async(|when, then| {
            when.method(DELETE);
            then.status(403)
                .json_body(json!({"message": "You are not allowed to delete this post"}));
        })
        .await;
    let before = collection.items();

    collection.request_delete(&ObjectId::new("p1")).expect("known id");
    let err = collection.confirm_delete().await.expect_err("forbidden");

    assert!(matches!(err, ApiError::Http { .. }));
    assert_eq!(collection.items(), before);
    assert_eq!(
        collection.notice(),
        Some(Notice::Failure(
            "You are not allowed to delete this post".to_string()
        ))
    );
}

#[tokio::test]
async fn cancelled_confirmation_issues_no_request() {
    let server = MockServer::start_async().await;
    let collection = seeded(&server).await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE);
            then.status(200);
        })
        .await;

    let target = ObjectId::new("p3");
    collection.request_delete(&target).expect("known id");
    assert_eq!(collection.snapshot().pending_delete, Some(target.clone()));
    collection.cancel_delete();

    assert!(collection.snapshot().pending_delete.is_none());
    assert!(collection.snapshot().contains(&target));
    assert!(matches!(
        collection.confirm_delete().await,
        Err(ApiError::Validation(_))
    ));
    delete.assert_hits_async(0).await;
}

#[tokio::test]
async fn failed_edit_keeps_the_committed_entity_byte_for_byte() {
    let server = MockServer::start_async().await;
    let collection = seeded(&server).await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/posts/update/p2");
            then.status(500).body("<html>Internal Server Error</html>");
        })
        .await;
    let before = serde_json::to_vec(&collection.items()).expect("encode");

    let id = ObjectId::new("p2");
    let mut draft = collection.begin_edit(&id).expect("draft");
    draft.title = "Rewritten".to_string();
    draft.category = Category::Olahraga;
    let err = collection.commit_edit(&id, draft).await.expect_err("server error");

    assert!(matches!(err, ApiError::MalformedResponse { .. }));
    let after = serde_json::to_vec(&collection.items()).expect("encode");
    assert_eq!(before, after);
    assert!(collection.snapshot().editing.is_none());
}

#[tokio::test]
async fn successful_edit_replaces_in_place_with_the_server_entity() {
    let server = MockServer::start_async().await;
    let collection = seeded(&server).await;
    let mut updated = article("p2", "olahraga");
    updated["title"] = json!("Rewritten");
    updated["updatedAt"] = json!("2024-06-01T00:00:00Z");
    let put = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/posts/update/p2")
                .json_body_includes(r#"{"title":"Rewritten","category":"olahraga"}"#);
            then.status(200).json_body(updated);
        })
        .await;

    let id = ObjectId::new("p2");
    let mut draft = collection.begin_edit(&id).expect("draft");
    draft.title = "Rewritten".to_string();
    draft.category = Category::Olahraga;
    // the draft is detached from committed state until the server confirms
    assert_eq!(collection.items()[1].title, "Title p2");

    collection.commit_edit(&id, draft).await.expect("commit");
    put.assert_async().await;

    let items = collection.items();
    assert_eq!(ids(&collection), ["p1", "p2", "p3"]);
    assert_eq!(items[1].title, "Rewritten");
    assert_eq!(items[1].category, Category::Olahraga);
    assert!(items[1].updated_at.is_some());
}

#[tokio::test]
async fn replacement_image_is_uploaded_before_the_update() {
    let server = MockServer::start_async().await;
    let media = MockServer::start_async().await;
    let upload = media
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(json!({"secure_url": "https://cdn.example/new.jpg"}));
        })
        .await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/posts/update/p1")
                .json_body_includes(r#"{"image":"https://cdn.example/new.jpg"}"#);
            then.status(200).json_body(json!({"message": "updated"}));
        })
        .await;

    let api = ApiClient::new(&server.base_url(), SessionContext::anonymous()).expect("client");
    let uploader = AssetUploader::new(
        reqwest::Client::new(),
        Some(Url::parse(&media.url("/upload")).expect("url")),
        Some("preset".into()),
    );
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/posts/getposts");
            then.status(200)
                .json_body(json!({"posts": [article("p1", "nasional")]}));
        })
        .await;
    let collection = RemoteCollection::<Posts>::new(api, NonZeroU32::new(9).expect("nz"))
        .with_uploader(uploader);
    collection.fetch(PostScope::default()).await.expect("fetch");

    let id = ObjectId::new("p1");
    let mut draft = collection.begin_edit(&id).expect("draft");
    draft.new_image = Some(AssetBlob::new(&b"jpeg-bytes"[..], "new.jpg", "image/jpeg"));
    collection.commit_edit(&id, draft).await.expect("commit");

    upload.assert_async().await;
    put.assert_async().await;
    // body was a bare acknowledgment, so the patch is applied locally
    assert_eq!(
        collection.items()[0].image_url.as_deref(),
        Some("https://cdn.example/new.jpg")
    );
}

#[tokio::test]
async fn failed_image_upload_sends_no_update() {
    let server = MockServer::start_async().await;
    let media = MockServer::start_async().await;
    media
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({}));
        })
        .await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT);
            then.status(200);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/posts/getposts");
            then.status(200)
                .json_body(json!({"posts": [article("p1", "nasional")]}));
        })
        .await;

    let api = ApiClient::new(&server.base_url(), SessionContext::anonymous()).expect("client");
    let uploader = AssetUploader::new(
        reqwest::Client::new(),
        Some(Url::parse(&media.url("/upload")).expect("url")),
        Some("preset".into()),
    );
    let collection = RemoteCollection::<Posts>::new(api, NonZeroU32::new(9).expect("nz"))
        .with_uploader(uploader);
    collection.fetch(PostScope::default()).await.expect("fetch");
    let before = collection.items();

    let id = ObjectId::new("p1");
    let mut draft = collection.begin_edit(&id).expect("draft");
    draft.new_image = Some(AssetBlob::new(&b"jpeg-bytes"[..], "new.jpg", "image/jpeg"));
    let err = collection.commit_edit(&id, draft).await.expect_err("upload failed");

    assert!(matches!(err, ApiError::Upload(_)));
    put.assert_hits_async(0).await;
    assert_eq!(collection.items(), before);
}

#[tokio::test]
async fn load_more_appends_and_short_page_ends_paging() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/posts/getposts")
                .query_param("startIndex", "0")
                .query_param("limit", "2");
            then.status(200).json_body(json!({"posts": [
                article("p1", "nasional"),
                article("p2", "nasional")
            ]}));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/posts/getposts")
                .query_param("startIndex", "2")
                .query_param("limit", "2");
            then.status(200)
                .json_body(json!({"posts": [article("p3", "nasional")]}));
        })
        .await;

    let collection = posts(&server, 2);
    collection.fetch(PostScope::default()).await.expect("fetch");
    assert!(collection.has_more());
    let first_page = collection.items();

    assert_eq!(collection.load_more().await.expect("more"), Outcome::Applied);
    second.assert_async().await;

    let items = collection.items();
    assert_eq!(ids(&collection), ["p1", "p2", "p3"]);
    assert_eq!(&items[..2], &first_page[..]);
    assert!(!collection.has_more());
    assert_eq!(collection.load_more().await.expect("no more"), Outcome::Skipped);
    second.assert_hits_async(1).await;
}

#[tokio::test]
async fn slower_earlier_fetch_never_overwrites_a_newer_one() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/posts/getposts")
                .query_param("category", "nasional");
            then.status(200)
                .delay(Duration::from_millis(400))
                .json_body(json!({"posts": [article("a1", "nasional")]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/posts/getposts")
                .query_param("category", "olahraga");
            then.status(200)
                .json_body(json!({"posts": [article("b1", "olahraga")]}));
        })
        .await;

    let collection = posts(&server, 9);
    let scope_a = PostScope {
        category: Some(Category::Nasional),
        ..PostScope::default()
    };
    let scope_b = PostScope {
        category: Some(Category::Olahraga),
        ..PostScope::default()
    };

    let (a, b) = tokio::join!(collection.fetch(scope_a), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        collection.fetch(scope_b.clone()).await
    });

    assert_eq!(b.expect("b"), Outcome::Applied);
    assert_eq!(a.expect("a"), Outcome::Superseded);
    assert_eq!(ids(&collection), ["b1"]);
    assert_eq!(collection.snapshot().scope, scope_b);
    assert_eq!(collection.phase(), LoadPhase::Loaded);
}

#[tokio::test]
async fn page_in_flight_is_dropped_when_scope_changes() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/comments/getcomments")
                .query_param("startIndex", "0");
            then.status(200).json_body(json!({"comments": [
                {"_id": "c1", "postId": "p1", "userId": "u1", "content": "a", "createdAt": "2024-05-01T10:00:00Z"}
            ]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/comments/getcomments")
                .query_param("startIndex", "1");
            then.status(200)
                .delay(Duration::from_millis(400))
                .json_body(json!({"comments": [
                    {"_id": "c2", "postId": "p1", "userId": "u1", "content": "b", "createdAt": "2024-05-01T10:00:00Z"}
                ]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/comments/getPostComments/other");
            then.status(200).json_body(json!({"comments": [
                {"_id": "c9", "postId": "p9", "userId": "u1", "content": "z", "createdAt": "2024-05-01T10:00:00Z"}
            ]}));
        })
        .await;

    let api = ApiClient::new(&server.base_url(), SessionContext::anonymous()).expect("client");
    let comments = RemoteCollection::<Comments>::new(api, NonZeroU32::new(1).expect("nz"));
    comments.fetch(CommentScope::default()).await.expect("fetch");
    assert!(comments.has_more());

    let other = CommentScope {
        post_slug: Some("other".into()),
    };
    let (more, refetch) = tokio::join!(comments.load_more(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        comments.fetch(other).await
    });

    assert_eq!(refetch.expect("refetch"), Outcome::Applied);
    assert_eq!(more.expect("more"), Outcome::Superseded);
    let ids: Vec<_> = comments
        .items()
        .into_iter()
        .map(|c| c.id.as_str().to_string())
        .collect();
    assert_eq!(ids, ["c9"]);
}
