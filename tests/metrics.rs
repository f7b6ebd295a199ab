use std::collections::HashSet;
use std::num::NonZeroU32;
use std::time::Duration;

use bytes::Bytes;
use httpmock::prelude::*;
use metrics_util::debugging::DebuggingRecorder;
use newsroom::client::{ApiClient, AssetBlob, AssetUploader};
use newsroom::api_types::Slug;
use newsroom::collection::{Outcome, Posts, RemoteCollection};
use newsroom::detail::ArticleDetail;
use newsroom::session::SessionContext;
use reqwest::{Method, Url};
use serde_json::json;

#[tokio::test]
async fn client_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/posts/getposts");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({"posts": []}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/upload");
            then.status(200)
                .json_body(json!({"secure_url": "https://cdn.example/a.png"}));
        })
        .await;

    let api = ApiClient::new(&server.base_url(), SessionContext::anonymous()).expect("client");
    api.request(Method::GET, "/api/posts/getposts", None)
        .await
        .expect("request");

    let uploader = AssetUploader::new(
        reqwest::Client::new(),
        Some(Url::parse(&server.url("/upload")).expect("url")),
        Some("preset".into()),
    );
    uploader
        .upload(AssetBlob::new(
            Bytes::from_static(b"png"),
            "a.png",
            "image/png",
        ))
        .await
        .expect("upload");

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/posts/post/slow");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({"message": "late"}));
        })
        .await;
    let detail = ArticleDetail::new(api.clone());
    let (stale, ()) = tokio::join!(detail.load(Slug::new("slow")), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        detail.unmount();
    });
    assert_eq!(stale.expect("stale"), Outcome::Cancelled);

    let posts = RemoteCollection::<Posts>::new(api, NonZeroU32::new(9).expect("nz"));
    let (first, second) = tokio::join!(posts.fetch(Default::default()), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        posts.fetch(Default::default()).await
    });
    assert_eq!(first.expect("first"), Outcome::Superseded);
    assert_eq!(second.expect("second"), Outcome::Applied);

    let entries = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = entries
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();
    let discarded_resources: HashSet<String> = entries
        .iter()
        .filter(|(composite_key, _, _, _)| {
            composite_key.key().name() == "newsroom_fetch_discarded_total"
        })
        .flat_map(|(composite_key, _, _, _)| {
            composite_key
                .key()
                .labels()
                .filter(|label| label.key() == "resource")
                .map(|label| label.value().to_string())
                .collect::<Vec<_>>()
        })
        .collect();

    let expected = [
        "newsroom_api_request_total",
        "newsroom_api_request_ms",
        "newsroom_upload_total",
        "newsroom_fetch_discarded_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
    assert!(discarded_resources.contains("post"));
    assert!(discarded_resources.contains("article"));
}
