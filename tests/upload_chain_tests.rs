//! Mock HTTP tests for the upload services and the fallback chain.
//!
//! These tests cover:
//! - Per-service response parsing (JSON, bare text)
//! - The tmpfiles.org direct-download rewrite
//! - Fallback ordering: first success wins, later services untouched

use animatic::upload::{Catbox, FileIo, TmpFiles, UploadChain, UploadError, Uploader};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// === Individual service tests ===

#[tokio::test]
async fn test_tmpfiles_parses_and_rewrites_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "data": {"url": "https://tmpfiles.org/12345/f.png"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uploader = TmpFiles::with_endpoint(mock_server.uri()).unwrap();
    let url = uploader.upload("f.png", b"bytes".to_vec()).await.unwrap();
    assert_eq!(url, "https://tmpfiles.org/dl/12345/f.png");
}

#[tokio::test]
async fn test_tmpfiles_error_status_in_body_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "error"})),
        )
        .mount(&mock_server)
        .await;

    let uploader = TmpFiles::with_endpoint(mock_server.uri()).unwrap();
    let result = uploader.upload("f.png", b"bytes".to_vec()).await;
    assert!(matches!(result, Err(UploadError::ServiceError { .. })));
}

#[tokio::test]
async fn test_catbox_returns_bare_text_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://files.catbox.moe/abc.png\n"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uploader = Catbox::with_endpoint(mock_server.uri()).unwrap();
    let url = uploader.upload("f.png", b"bytes".to_vec()).await.unwrap();
    assert_eq!(url, "https://files.catbox.moe/abc.png");
}

#[tokio::test]
async fn test_catbox_empty_body_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&mock_server)
        .await;

    let uploader = Catbox::with_endpoint(mock_server.uri()).unwrap();
    let result = uploader.upload("f.png", b"bytes".to_vec()).await;
    assert!(matches!(result, Err(UploadError::ServiceError { .. })));
}

#[tokio::test]
async fn test_fileio_parses_link() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "link": "https://file.io/abc"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uploader = FileIo::with_endpoint(mock_server.uri()).unwrap();
    let url = uploader.upload("f.png", b"bytes".to_vec()).await.unwrap();
    assert_eq!(url, "https://file.io/abc");
}

#[tokio::test]
async fn test_fileio_unsuccessful_response_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": false})),
        )
        .mount(&mock_server)
        .await;

    let uploader = FileIo::with_endpoint(mock_server.uri()).unwrap();
    let result = uploader.upload("f.png", b"bytes".to_vec()).await;
    assert!(matches!(result, Err(UploadError::ServiceError { .. })));
}

#[tokio::test]
async fn test_non_200_is_a_service_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let uploader = TmpFiles::with_endpoint(mock_server.uri()).unwrap();
    let result = uploader.upload("f.png", b"bytes".to_vec()).await;
    match result {
        Err(UploadError::ServiceError { service, message }) => {
            assert_eq!(service, "tmpfiles.org");
            assert!(message.contains("503"));
        }
        other => panic!("Expected ServiceError, got {:?}", other),
    }
}

// === Fallback chain tests ===

/// Chain where service A (tmpfiles) fails and B (catbox) succeeds.
/// C (file.io) must never be contacted.
#[tokio::test]
async fn test_chain_falls_through_to_second_service_and_stops() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;
    let server_c = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server_a)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://files.catbox.moe/ok.png"))
        .expect(1)
        .mount(&server_b)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server_c)
        .await;

    let chain = UploadChain::new(vec![
        Box::new(TmpFiles::with_endpoint(server_a.uri()).unwrap()),
        Box::new(Catbox::with_endpoint(server_b.uri()).unwrap()),
        Box::new(FileIo::with_endpoint(server_c.uri()).unwrap()),
    ]);

    let upload = chain.upload("f.png", b"bytes").await.unwrap();
    assert_eq!(upload.service, "catbox.moe");
    assert_eq!(upload.url, "https://files.catbox.moe/ok.png");
}

#[tokio::test]
async fn test_chain_first_service_success_skips_the_rest() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "data": {"url": "https://tmpfiles.org/1/f.png"}
        })))
        .expect(1)
        .mount(&server_a)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server_b)
        .await;

    let chain = UploadChain::new(vec![
        Box::new(TmpFiles::with_endpoint(server_a.uri()).unwrap()),
        Box::new(Catbox::with_endpoint(server_b.uri()).unwrap()),
    ]);

    let upload = chain.upload("f.png", b"bytes").await.unwrap();
    assert_eq!(upload.service, "tmpfiles.org");
    assert_eq!(upload.url, "https://tmpfiles.org/dl/1/f.png");
}

#[tokio::test]
async fn test_chain_all_services_failing_is_total_failure() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;
    let server_c = MockServer::start().await;

    for server in [&server_a, &server_b, &server_c] {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(server)
            .await;
    }

    let chain = UploadChain::new(vec![
        Box::new(TmpFiles::with_endpoint(server_a.uri()).unwrap()),
        Box::new(Catbox::with_endpoint(server_b.uri()).unwrap()),
        Box::new(FileIo::with_endpoint(server_c.uri()).unwrap()),
    ]);

    let result = chain.upload("f.png", b"bytes").await;
    assert!(matches!(
        result,
        Err(UploadError::AllServicesFailed { attempted: 3 })
    ));
}

#[tokio::test]
async fn test_chain_recovers_from_malformed_json() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .expect(1)
        .mount(&server_a)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://files.catbox.moe/x.png"))
        .expect(1)
        .mount(&server_b)
        .await;

    let chain = UploadChain::new(vec![
        Box::new(TmpFiles::with_endpoint(server_a.uri()).unwrap()),
        Box::new(Catbox::with_endpoint(server_b.uri()).unwrap()),
    ]);

    let upload = chain.upload("f.png", b"bytes").await.unwrap();
    assert_eq!(upload.service, "catbox.moe");
}

#[tokio::test]
async fn test_default_chain_has_three_services() {
    let chain = UploadChain::with_default_services().unwrap();
    assert_eq!(chain.len(), 3);
}

#[tokio::test]
async fn test_catbox_request_includes_reqtype_field() {
    let mock_server = MockServer::start().await;

    // The multipart body must carry reqtype=fileupload alongside the file.
    Mock::given(method("POST"))
        .and(path("/"))
        .and(wiremock::matchers::body_string_contains("reqtype"))
        .and(wiremock::matchers::body_string_contains("fileupload"))
        .and(wiremock::matchers::body_string_contains("fileToUpload"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://files.catbox.moe/y.png"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uploader = Catbox::with_endpoint(mock_server.uri()).unwrap();
    let result = uploader.upload("f.png", b"bytes".to_vec()).await;
    assert!(result.is_ok());
}
