//! Integration tests for webhook delivery

use site_audit::config::{parse_config, NotifierConfig};
use site_audit::output::{Notifier, API_KEY_HEADER};
use site_audit::storage::{open_storage, AuditRecord, AuditStore, NewAudit};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notifier_config(dir: &TempDir, callback_url: &str) -> NotifierConfig {
    let config = parse_config(&format!(
        r#"
[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"

[storage]
database-path = "{db}"
work-dir = "{work}"

[notifier]
callback-url = "{callback}"
api-key = "secret-key"
retry-base-ms = 20
max-attempts = 3
"#,
        db = dir.path().join("audits.db").display(),
        work = dir.path().join("work").display(),
        callback = callback_url,
    ))
    .expect("test config should be valid");

    config.notifier.expect("notifier section present")
}

fn stored_audit(dir: &TempDir) -> AuditRecord {
    let mut storage = open_storage(&dir.path().join("audits.db")).unwrap();
    let id = storage
        .create_audit(&NewAudit {
            url: "https://site.test/".to_string(),
            user_id: Some("user-7".to_string()),
            request_id: Some("req-1".to_string()),
        })
        .unwrap();
    storage.get_audit(id).unwrap()
}

/// Waits until the server has seen `count` requests or a second passes
async fn wait_for_requests(server: &MockServer, count: usize) -> usize {
    for _ in 0..50 {
        let seen = server.received_requests().await.unwrap_or_default().len();
        if seen >= count {
            return seen;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn test_delivery_carries_api_key_and_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/audit"))
        .and(header(API_KEY_HEADER, "secret-key"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = notifier_config(&dir, &format!("{}/hooks/audit", server.uri()));
    let notifier = Notifier::new(&config, "TestBot/1.0.0").unwrap();

    let audit = stored_audit(&dir);
    notifier.notify(&audit).await.unwrap();
    notifier.shutdown().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["id"], audit.id);
    assert_eq!(body["url"], "https://site.test/");
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["user_id"], "user-7");
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = notifier_config(&dir, &format!("{}/hook", server.uri()));
    let notifier = Notifier::new(&config, "TestBot/1.0.0").unwrap();

    notifier.notify(&stored_audit(&dir)).await.unwrap();

    assert_eq!(wait_for_requests(&server, 2).await, 2);
    notifier.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_waits_for_scheduled_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = notifier_config(&dir, &format!("{}/hook", server.uri()));
    let notifier = Notifier::new(&config, "TestBot/1.0.0").unwrap();

    // Shutting down straight away still lets the retry after the 500 go out
    notifier.notify(&stored_audit(&dir)).await.unwrap();
    notifier.shutdown().await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_retries_stop_at_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = notifier_config(&dir, &format!("{}/hook", server.uri()));
    let notifier = Notifier::new(&config, "TestBot/1.0.0").unwrap();

    notifier.notify(&stored_audit(&dir)).await.unwrap();

    // 20ms then 40ms of backoff between the three attempts
    assert_eq!(wait_for_requests(&server, 3).await, 3);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    notifier.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = notifier_config(&dir, &format!("{}/hook", server.uri()));
    let notifier = Notifier::new(&config, "TestBot/1.0.0").unwrap();

    notifier.notify(&stored_audit(&dir)).await.unwrap();
    assert_eq!(wait_for_requests(&server, 1).await, 1);
    tokio::time::sleep(Duration::from_millis(150)).await;
    notifier.shutdown().await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_notify_after_shutdown_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = notifier_config(&dir, "http://127.0.0.1:9/hook");
    let notifier = Notifier::new(&config, "TestBot/1.0.0").unwrap();

    notifier.shutdown().await.unwrap();
    assert!(notifier.notify(&stored_audit(&dir)).await.is_err());
}
