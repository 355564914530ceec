//! Integration tests for external link verification
//!
//! These tests use wiremock servers as link targets and run the verifier
//! end-to-end, including chunk timeouts and the overall deadline.

use site_audit::config::{parse_config, Config};
use site_audit::findings::{LinkStatus, LinkTarget};
use site_audit::verifier::LinkVerifier;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with zero politeness delays
fn create_test_config(work_dir: &TempDir, verifier_overrides: &str) -> Config {
    parse_config(&format!(
        r#"
[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"

[storage]
database-path = "{db}"
work-dir = "{work}"

[verifier]
gentle-delay-ms = 0
conservative-delay-ms = 0
aggressive-delay-ms = 0
gentle-retries = 1
request-timeout-secs = 5
{overrides}
"#,
        db = work_dir.path().join("audits.db").display(),
        work = work_dir.path().join("work").display(),
        overrides = verifier_overrides,
    ))
    .expect("test config should be valid")
}

fn target(url: String, sources: &[&str]) -> LinkTarget {
    LinkTarget {
        url,
        sources: sources.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn test_head_failure_recovered_by_get() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let verifier = LinkVerifier::new(&create_test_config(&dir, "")).unwrap();
    let outcome = verifier
        .verify(vec![target(format!("{}/docs", server.uri()), &["https://site.test/"])])
        .await
        .unwrap();

    assert!(outcome.external_links.is_empty());
    assert_eq!(outcome.stats.urls_checked, 1);
    assert_eq!(outcome.stats.profile, "conservative");
}

#[tokio::test]
async fn test_get_result_supersedes_head() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let verifier = LinkVerifier::new(&create_test_config(&dir, "")).unwrap();
    let outcome = verifier
        .verify(vec![
            target(format!("{}/gone", server.uri()), &["https://site.test/a", "https://site.test/b"]),
            target(format!("{}/private", server.uri()), &["https://site.test/a"]),
            target(format!("{}/flaky", server.uri()), &["https://site.test/c"]),
        ])
        .await
        .unwrap();

    let broken = &outcome.external_links.broken;
    assert_eq!(broken.len(), 2);
    assert_eq!(broken[0].url, format!("{}/gone", server.uri()));
    assert_eq!(broken[0].status, LinkStatus::Http(410));
    assert_eq!(
        broken[0].source_urls,
        vec!["https://site.test/a".to_string(), "https://site.test/b".to_string()]
    );

    // 5xx is not retried with GET and is filed as broken
    assert_eq!(broken[1].status, LinkStatus::Http(503));

    assert_eq!(outcome.external_links.permission.len(), 1);
    assert_eq!(outcome.external_links.counts().total, 3);
}

#[tokio::test]
async fn test_at_most_max_urls_are_checked() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let targets: Vec<LinkTarget> = (0..150)
        .map(|i| target(format!("{}/page/{}", server.uri(), i), &[]))
        .collect();

    let dir = TempDir::new().unwrap();
    let verifier = LinkVerifier::new(&create_test_config(&dir, "")).unwrap();
    let outcome = verifier.verify(targets).await.unwrap();

    assert_eq!(outcome.stats.urls_discovered, 150);
    assert_eq!(outcome.stats.urls_checked, 100);
    assert_eq!(outcome.stats.urls_excluded, 50);
    assert_eq!(outcome.stats.chunks_total, 5);
    assert_eq!(outcome.stats.chunks_succeeded, 5);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 100);
}

#[tokio::test]
async fn test_unreachable_is_never_suppressed() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let verifier = LinkVerifier::new(&create_test_config(&dir, "")).unwrap();
    let outcome = verifier
        .verify(vec![
            // Port 9 on loopback has no listener
            target("http://127.0.0.1:9/login/".to_string(), &["https://site.test/"]),
            target(format!("{}/login/", server.uri()), &["https://site.test/"]),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.stats.profile, "gentle");
    assert_eq!(outcome.stats.suppressed, 1);
    assert_eq!(outcome.external_links.unreachable.len(), 1);
    assert_eq!(outcome.external_links.unreachable[0].url, "http://127.0.0.1:9/login/");
    assert!(outcome.external_links.broken.is_empty());
}

#[tokio::test]
async fn test_timed_out_chunk_does_not_block_others() {
    let slow = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_secs(4)))
        .mount(&slow)
        .await;
    let fast = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&fast)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&fast)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "chunk-size = 1\nchunk-timeout-secs = 1");
    let verifier = LinkVerifier::new(&config).unwrap();

    let started = Instant::now();
    let outcome = verifier
        .verify(vec![
            target(format!("{}/slow", slow.uri()), &["https://site.test/"]),
            target(format!("{}/fast", fast.uri()), &["https://site.test/"]),
        ])
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(outcome.stats.chunks_total, 2);
    assert_eq!(outcome.stats.chunks_timed_out, 1);
    assert_eq!(outcome.stats.chunks_succeeded, 1);
    assert_eq!(outcome.external_links.broken.len(), 1);
    assert_eq!(outcome.external_links.broken[0].url, format!("{}/fast", fast.uri()));
}

#[tokio::test]
async fn test_overall_deadline_keeps_finished_chunks() {
    let slow = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&slow)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(
        &dir,
        "chunk-size = 1\nmax-concurrent-chunks = 1\nchunk-timeout-secs = 2\noverall-timeout-secs = 3",
    );
    let verifier = LinkVerifier::new(&config).unwrap();

    let started = Instant::now();
    let outcome = verifier
        .verify(vec![
            target(format!("{}/one", slow.uri()), &[]),
            target(format!("{}/two", slow.uri()), &[]),
        ])
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.stats.chunks_timed_out, 1);
    assert_eq!(outcome.stats.chunks_failed, 1);
    assert_eq!(outcome.stats.urls_checked, 0);
    assert!(outcome.external_links.is_empty());
}

#[tokio::test]
async fn test_chunk_artifacts_are_removed() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let verifier = LinkVerifier::new(&create_test_config(&dir, "")).unwrap();
    verifier
        .verify(vec![target(format!("{}/a", server.uri()), &[])])
        .await
        .unwrap();

    let leftovers = std::fs::read_dir(dir.path().join("work")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_host_limit_holds_across_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    // Three one-URL chunks run at once, all aimed at the same host
    let config = create_test_config(&dir, "chunk-size = 1\nmax-concurrent-chunks = 3");
    let verifier = LinkVerifier::new(&config).unwrap();

    let started = Instant::now();
    let outcome = verifier
        .verify(vec![
            target(format!("{}/a", server.uri()), &[]),
            target(format!("{}/b", server.uri()), &[]),
            target(format!("{}/c", server.uri()), &[]),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.stats.profile, "conservative");
    assert_eq!(outcome.stats.chunks_succeeded, 3);
    // One request at a time for the host, so the delays add up
    assert!(started.elapsed() >= Duration::from_millis(850));
}
