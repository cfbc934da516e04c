//! Fingerprint probe against a mock origin.

use sitepulse::{ChangeReason, FingerprintProbe, ProbeOutcome, StoredFingerprint};

fn probe() -> FingerprintProbe {
    FingerprintProbe::new("sitepulse-test", 5).expect("probe builds")
}

fn stored_v1() -> StoredFingerprint {
    StoredFingerprint {
        etag: Some("\"v1\"".to_string()),
        last_modified: Some("Mon, 01 Jan 2024 00:00:00 GMT".to_string()),
        content_length: Some(100),
        sample_hash: None,
    }
}

#[tokio::test]
async fn replays_stored_validators_and_reads_304() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("HEAD", "/page")
        .match_header("if-none-match", "\"v1\"")
        .match_header("if-modified-since", "Mon, 01 Jan 2024 00:00:00 GMT")
        .with_status(304)
        .create_async()
        .await;

    let result = probe()
        .probe(&format!("{}/page", server.url()), &stored_v1())
        .await;

    assert_eq!(result.outcome, ProbeOutcome::Unchanged);
    mock.assert_async().await;
}

#[tokio::test]
async fn etag_mismatch_classifies_changed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/page")
        .with_status(200)
        .with_header("etag", "\"v2\"")
        .with_header("last-modified", "Mon, 01 Jan 2024 00:00:00 GMT")
        .create_async()
        .await;

    let result = probe()
        .probe(&format!("{}/page", server.url()), &stored_v1())
        .await;

    assert_eq!(
        result.outcome,
        ProbeOutcome::Changed {
            reason: ChangeReason::Etag
        }
    );
    assert_eq!(result.observed.etag.as_deref(), Some("\"v2\""));
}

#[tokio::test]
async fn weak_etag_compares_equal_to_strong() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/page")
        .with_status(200)
        .with_header("etag", "W/\"v1\"")
        .with_header("last-modified", "Mon, 01 Jan 2024 00:00:00 GMT")
        .with_header("content-length", "100")
        .create_async()
        .await;

    let result = probe()
        .probe(&format!("{}/page", server.url()), &stored_v1())
        .await;

    assert_eq!(result.outcome, ProbeOutcome::Unchanged);
}

#[tokio::test]
async fn first_observation_captures_headers() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/fresh")
        .with_status(200)
        .with_header("etag", "\"new\"")
        .with_header("content-length", "512")
        .create_async()
        .await;

    let result = probe()
        .probe(
            &format!("{}/fresh", server.url()),
            &StoredFingerprint::default(),
        )
        .await;

    assert_eq!(result.outcome, ProbeOutcome::FirstObservation);
    assert_eq!(result.observed.etag.as_deref(), Some("\"new\""));
    assert_eq!(result.observed.content_length, Some(512));
}

#[tokio::test]
async fn head_rejection_falls_back_to_get() {
    let mut server = mockito::Server::new_async().await;
    let head = server
        .mock("HEAD", "/page")
        .with_status(405)
        .create_async()
        .await;
    let get = server
        .mock("GET", "/page")
        .with_status(200)
        .with_header("etag", "\"v2\"")
        .create_async()
        .await;

    let result = probe()
        .probe(&format!("{}/page", server.url()), &stored_v1())
        .await;

    assert_eq!(
        result.outcome,
        ProbeOutcome::Changed {
            reason: ChangeReason::Etag
        }
    );
    head.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn server_error_never_advances_fingerprints() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/page")
        .with_status(503)
        .create_async()
        .await;

    let result = probe()
        .probe(&format!("{}/page", server.url()), &stored_v1())
        .await;

    assert!(matches!(
        result.outcome,
        ProbeOutcome::UnchangedWithError { .. }
    ));
}

#[tokio::test]
async fn connection_failure_is_unchanged_with_error() {
    // Nothing listens on this port.
    let result = probe()
        .probe("http://127.0.0.1:9/page", &stored_v1())
        .await;
    assert!(matches!(
        result.outcome,
        ProbeOutcome::UnchangedWithError { .. }
    ));
}

#[tokio::test]
async fn headerless_origin_with_stored_sample_needs_sample_check() {
    let mut server = mockito::Server::new_async().await;
    server.mock("HEAD", "/bare").with_status(200).create_async().await;

    let stored = StoredFingerprint {
        sample_hash: Some("abc".to_string()),
        ..Default::default()
    };
    let result = probe()
        .probe(&format!("{}/bare", server.url()), &stored)
        .await;

    assert_eq!(result.outcome, ProbeOutcome::NeedsSampleCheck);
}

#[tokio::test]
async fn fetch_body_returns_text() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/body")
        .with_status(200)
        .with_body("<html><title>Hi</title></html>")
        .create_async()
        .await;

    let body = probe()
        .fetch_body(&format!("{}/body", server.url()))
        .await
        .expect("body fetches");
    assert!(body.contains("<title>Hi</title>"));
}
