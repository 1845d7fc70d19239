//! HTTP fetcher tests
//!
//! Tests size probes, downloads, and the service end to end over mockito.

use std::sync::Arc;
use std::time::Duration;

use mockito::Server;
use reelplay::cache::key;
use reelplay::{
    FetchError, HttpFetcher, MediaFetcher, MediaRef, MediaService, MediaSource, PolicyDecision,
    VideoCachePolicy,
};

const BODY: &[u8] = b"0123456789abcdef0123456789abcdef";

// =============================================================================
// Size Probe Tests
// =============================================================================

#[tokio::test]
async fn test_content_length_reads_head() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("HEAD", "/v/clip.mp4")
        .with_status(200)
        .with_header("content-length", "32")
        .with_body(BODY)
        .create_async()
        .await;

    let fetcher = HttpFetcher::default();
    let url = format!("{}/v/clip.mp4", server.url());
    let bytes = fetcher.content_length(&url).await.unwrap();

    mock.assert_async().await;
    assert_eq!(bytes, 32);
}

#[tokio::test]
async fn test_content_length_404() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("HEAD", "/v/gone.mp4")
        .with_status(404)
        .create_async()
        .await;

    let fetcher = HttpFetcher::with_client(reqwest::Client::new());
    let url = format!("{}/v/gone.mp4", server.url());
    let err = fetcher.content_length(&url).await.unwrap_err();

    assert!(matches!(err, FetchError::Status(404)));
}

#[tokio::test]
async fn test_content_length_unreachable_host() {
    let fetcher = HttpFetcher::default();
    let result = fetcher.content_length("http://127.0.0.1:1/v.mp4").await;
    assert!(matches!(result, Err(FetchError::Request(_))));
}

#[tokio::test]
async fn test_content_length_honours_timeout() {
    // Accepts connections but never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let fetcher = HttpFetcher::new(Duration::from_millis(200));
    let url = format!("http://{}/v/slow.mp4", addr);
    let result = tokio::time::timeout(Duration::from_secs(5), fetcher.content_length(&url))
        .await
        .expect("configured timeout should fire first");

    assert!(matches!(result, Err(FetchError::Request(_))));
}

// =============================================================================
// Download Tests
// =============================================================================

#[tokio::test]
async fn test_download_writes_whole_body() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/p/photo.jpg")
        .with_status(200)
        .with_body(BODY)
        .create_async()
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("photo");

    let fetcher = HttpFetcher::default();
    let url = format!("{}/p/photo.jpg", server.url());
    let written = fetcher.download(&url, &dest).await.unwrap();

    mock.assert_async().await;
    assert_eq!(written, BODY.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), BODY);

    // Only the final file remains
    let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_download_error_leaves_nothing_behind() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/p/broken.jpg")
        .with_status(500)
        .create_async()
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("broken");

    let fetcher = HttpFetcher::default();
    let url = format!("{}/p/broken.jpg", server.url());
    let err = fetcher.download(&url, &dest).await.unwrap_err();

    assert!(matches!(err, FetchError::Status(500)));
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

// =============================================================================
// Policy and Service Tests
// =============================================================================

#[tokio::test]
async fn test_policy_decision_over_http() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("HEAD", "/v/big.mp4")
        .with_status(200)
        .with_header("content-length", "32")
        .with_body(BODY)
        .create_async()
        .await;

    let fetcher = HttpFetcher::default();
    let url = format!("{}/v/big.mp4", server.url());

    let tight = VideoCachePolicy::new(1, 16);
    assert_eq!(
        tight.evaluate(&url, &fetcher).await,
        PolicyDecision::SkipSize { bytes: 32 }
    );

    let roomy = VideoCachePolicy::new(1, 64);
    assert_eq!(
        roomy.evaluate(&url, &fetcher).await,
        PolicyDecision::Cache { bytes: 32 }
    );
}

#[tokio::test]
async fn test_service_caches_video_over_http() {
    let mut server = Server::new_async().await;

    let head = server
        .mock("HEAD", "/v/clip.mp4")
        .with_status(200)
        .with_header("content-length", "32")
        .with_body(BODY)
        .create_async()
        .await;
    let get = server
        .mock("GET", "/v/clip.mp4")
        .with_status(200)
        .with_body(BODY)
        .expect(1)
        .create_async()
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let service = MediaService::new(
        tmp.path(),
        VideoCachePolicy::new(1, 1024),
        Arc::new(HttpFetcher::default()),
    );

    let url = format!("{}/v/clip.mp4", server.url());
    let media = MediaRef::video(url.clone());

    let source = service.resolve(&media).settled().await;
    let expected = tmp.path().join("videos").join(key::encode(&url));
    assert_eq!(source, MediaSource::Local { path: expected.clone() });
    assert_eq!(std::fs::read(&expected).unwrap(), BODY);

    // Second resolve is served from the index
    assert!(service.resolve(&media).is_ready());

    head.assert_async().await;
    get.assert_async().await;
}
