//! End-to-end tests for the audit pipeline
//!
//! These tests run complete audits against wiremock sites: preflight, crawl,
//! interpretation, external verification, and report assembly.

use async_trait::async_trait;
use site_audit::config::{parse_config, Config};
use site_audit::crawler::{Crawler, MultiValue, PageRecord};
use site_audit::findings::LinkStatus;
use site_audit::pipeline::{AuditService, Orchestrator, NO_USABLE_RESULTS};
use site_audit::storage::{open_storage, shared, AuditStore, NewAudit, SharedStore};
use site_audit::url::{DnsCheck, DomainResolver};
use site_audit::{AuditError, AuditStatus};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted in `dir`
fn create_test_config(dir: &TempDir) -> Config {
    parse_config(&format!(
        r#"
[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"

[crawler]
max-pages = 10
request-timeout-secs = 5

[storage]
database-path = "{db}"
work-dir = "{work}"

[verifier]
gentle-delay-ms = 0
conservative-delay-ms = 0
aggressive-delay-ms = 0
request-timeout-secs = 5

[pipeline]
workers = 1
"#,
        db = dir.path().join("audits.db").display(),
        work = dir.path().join("work").display(),
    ))
    .expect("test config should be valid")
}

fn create_store(config: &Config) -> SharedStore {
    shared(open_storage(std::path::Path::new(&config.storage.database_path)).unwrap())
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

/// Crawler that returns canned records
struct FakeCrawler {
    records: Vec<PageRecord>,
}

#[async_trait]
impl Crawler for FakeCrawler {
    async fn crawl(&self, _start: &Url, _max_pages: u32) -> Result<Vec<PageRecord>, AuditError> {
        Ok(self.records.clone())
    }
}

#[tokio::test]
async fn test_full_audit_against_mock_site() {
    let external = MockServer::start().await;
    Mock::given(path("/docs/guide"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&external)
        .await;
    Mock::given(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&external)
        .await;

    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><head>
                <title>Acme Widgets Shop</title>
                <meta name="description" content="Widgets for every purpose">
              </head><body>
                <h1>Acme Widgets</h1>
                <a href="/about">About</a>
                <a href="/missing">Old page</a>
                <a href="{ext}/docs/guide">Guide</a>
                <a href="{ext}/ok">Partner</a>
              </body></html>"#,
            ext = external.uri()
        )))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(format!(
            r#"<html><head><title>About Acme</title></head><body>
                <h1>About</h1><h1>Team</h1>
                <a href="/">Home</a>
                <a href="{ext}/docs/guide">Guide</a>
              </body></html>"#,
            ext = external.uri()
        )))
        .mount(&site)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let service = AuditService::new(config.clone(), create_store(&config)).unwrap();

    let root = format!("{}/", site.uri());
    let audit_id = service
        .start_audit(&root, None, Some("user-1".to_string()), Some("req-9".to_string()))
        .await
        .unwrap();
    let audit = service
        .wait_for_audit(audit_id, Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(audit.status, AuditStatus::Complete, "audit: {:?}", audit);
    assert!(audit.completed_at.is_some());
    assert_eq!(audit.user_id.as_deref(), Some("user-1"));
    assert_eq!(audit.request_id.as_deref(), Some("req-9"));

    let report = audit.report.expect("completed audit has a report");
    assert_eq!(report.summary.pages_analyzed, 2);
    assert_eq!(report.summary.pages_missing_meta_description, 1);
    assert_eq!(report.summary.headings.single, 1);
    assert_eq!(report.summary.headings.multiple, 1);

    // Internal 404 with the page that links to it
    assert_eq!(report.internal_links.broken.len(), 1);
    let missing = &report.internal_links.broken[0];
    assert_eq!(missing.url, format!("{}/missing", site.uri()));
    assert_eq!(missing.status, LinkStatus::Http(404));
    assert_eq!(missing.source_urls, vec![root.clone()]);

    // External 404 referenced from both pages
    assert_eq!(report.summary.external_links_discovered, 2);
    assert_eq!(report.summary.external_links_checked, 2);
    assert_eq!(report.summary.external_links.broken, 1);
    let guide = &report.external_links.broken[0];
    assert_eq!(guide.url, format!("{}/docs/guide", external.uri()));
    assert_eq!(guide.source_urls.len(), 2);
    assert!(guide.source_urls.contains(&root));

    let keywords: Vec<&str> = report
        .summary
        .top_keywords
        .iter()
        .map(|k| k.keyword.as_str())
        .collect();
    assert_eq!(keywords.first(), Some(&"acme"));
    assert!(keywords.contains(&"widgets"));

    let verification = report.verification.expect("verification stats recorded");
    assert_eq!(verification.chunks_succeeded, verification.chunks_total);

    // The crawl artifact is removed once interpreted
    let leftovers = std::fs::read_dir(dir.path().join("work")).unwrap().count();
    assert_eq!(leftovers, 0);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_url_fails_audit() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let service = AuditService::new(config.clone(), create_store(&config)).unwrap();

    let audit_id = service
        .start_audit("localhost", None, None, None)
        .await
        .unwrap();
    let audit = service
        .wait_for_audit(audit_id, Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(audit.status, AuditStatus::Failed);
    assert!(audit.report.is_none());
    assert_eq!(
        audit.error_message.as_deref(),
        Some("Please enter a valid website URL (e.g., https://example.com).")
    );
    assert!(audit
        .technical_error
        .as_deref()
        .unwrap_or_default()
        .contains("localhost"));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_start_page_fails_audit() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let service = AuditService::new(config.clone(), create_store(&config)).unwrap();

    // Nothing listens on the discard port
    let audit_id = service
        .start_audit("http://127.0.0.1:9/", None, None, None)
        .await
        .unwrap();
    let audit = service
        .wait_for_audit(audit_id, Duration::from_secs(20))
        .await
        .unwrap();

    assert_eq!(audit.status, AuditStatus::Failed);
    assert!(audit.error_message.is_some());
    assert!(audit.technical_error.unwrap().starts_with("Crawl failed"));

    service.shutdown().await.unwrap();
}

/// Resolver that knows no hosts
struct EmptyResolver;

#[async_trait]
impl DomainResolver for EmptyResolver {
    async fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{}: NXDOMAIN", host),
        ))
    }
}

#[tokio::test]
async fn test_unknown_domain_fails_before_crawling() {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(create_test_config(&dir));
    let store = create_store(&config);

    let orchestrator = Orchestrator::new(Arc::clone(&config), store.clone())
        .unwrap()
        .with_dns(DnsCheck::with_resolvers(
            Arc::new(EmptyResolver),
            Arc::new(EmptyResolver),
            Duration::from_secs(1),
        ));

    let status = orchestrator
        .run_audit(7, "https://no-such-site.example", 10)
        .await;
    assert_eq!(status, AuditStatus::Failed);

    let audit = store.lock().unwrap().get_audit(7).unwrap();
    assert_eq!(
        audit.error_message.as_deref(),
        Some("Website not found. Please check the URL and try again.")
    );
    assert!(audit
        .technical_error
        .as_deref()
        .unwrap_or_default()
        .contains("does not exist"));
    assert!(audit.report.is_none());
}

#[tokio::test]
async fn test_crawl_without_usable_records_fails() {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(create_test_config(&dir));
    let store = create_store(&config);

    let crawler = FakeCrawler {
        records: vec![PageRecord {
            url: "   ".to_string(),
            status: Some(200),
            ..Default::default()
        }],
    };
    let orchestrator = Orchestrator::new(Arc::clone(&config), store)
        .unwrap()
        .with_crawler(Arc::new(crawler));
    let service = AuditService::with_orchestrator(config, orchestrator);

    let audit_id = service
        .start_audit("http://127.0.0.1/", None, None, None)
        .await
        .unwrap();
    let audit = service
        .wait_for_audit(audit_id, Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(audit.status, AuditStatus::Failed);
    assert_eq!(
        audit.error_message.as_deref(),
        Some("No content could be analyzed on this website.")
    );
    assert!(audit
        .technical_error
        .as_deref()
        .unwrap_or_default()
        .contains(NO_USABLE_RESULTS));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_internal_only_crawl_completes_without_external_checks() {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(create_test_config(&dir));
    let store = create_store(&config);

    let crawler = FakeCrawler {
        records: vec![
            PageRecord {
                url: "http://127.0.0.1/".to_string(),
                status: Some(200),
                title: Some("Home".to_string()),
                ..Default::default()
            },
            PageRecord {
                url: "http://127.0.0.1/gone".to_string(),
                status: Some(410),
                referer_header: Some("http://127.0.0.1/".to_string()),
                ..Default::default()
            },
        ],
    };
    let orchestrator = Orchestrator::new(Arc::clone(&config), store.clone())
        .unwrap()
        .with_crawler(Arc::new(crawler));

    let status = orchestrator.run_audit(42, "http://127.0.0.1/", 10).await;
    assert_eq!(status, AuditStatus::Complete);

    let audit = store.lock().unwrap().get_audit(42).unwrap();
    let report = audit.report.unwrap();
    assert_eq!(report.summary.pages_analyzed, 1);
    assert_eq!(report.summary.internal_links.broken, 1);
    assert_eq!(report.summary.external_links_checked, 0);
    assert!(report.external_links.is_empty());
}

#[tokio::test]
async fn test_internal_findings_visible_while_verifying() {
    let external = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_secs(2)))
        .mount(&external)
        .await;

    let dir = TempDir::new().unwrap();
    let config = Arc::new(create_test_config(&dir));
    let store = create_store(&config);

    let crawler = FakeCrawler {
        records: vec![
            PageRecord {
                url: "http://127.0.0.1/".to_string(),
                status: Some(200),
                title: Some("Home".to_string()),
                links: Some(MultiValue::List(vec![
                    "/missing".to_string(),
                    format!("{}/slow", external.uri()),
                ])),
                ..Default::default()
            },
            PageRecord {
                url: "http://127.0.0.1/missing".to_string(),
                status: Some(404),
                referer_header: Some("http://127.0.0.1/".to_string()),
                ..Default::default()
            },
        ],
    };
    let orchestrator = Arc::new(
        Orchestrator::new(Arc::clone(&config), store.clone())
            .unwrap()
            .with_crawler(Arc::new(crawler)),
    );

    let running = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_audit(11, "http://127.0.0.1/", 10).await })
    };

    // Poll until the checkpoint lands; verification is still held open
    let mut checkpoint = None;
    for _ in 0..100 {
        let audit = store.lock().unwrap().find_audit(11).unwrap();
        if let Some(audit) = audit.filter(|a| a.status == AuditStatus::AnalyzingExternal) {
            checkpoint = Some(audit);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let checkpoint = checkpoint.expect("audit reaches ANALYZING_EXTERNAL before completing");
    assert!(checkpoint.completed_at.is_none());
    let partial = checkpoint.report.expect("internal findings are persisted");
    assert_eq!(partial.internal_links.broken.len(), 1);
    assert_eq!(partial.internal_links.broken[0].url, "http://127.0.0.1/missing");
    assert_eq!(
        partial.internal_links.broken[0].source_urls,
        vec!["http://127.0.0.1/".to_string()]
    );
    assert_eq!(partial.summary.pages_analyzed, 1);
    assert!(partial.external_links.is_empty());

    assert_eq!(running.await.unwrap(), AuditStatus::Complete);
    let finished = store.lock().unwrap().get_audit(11).unwrap();
    let report = finished.report.unwrap();
    assert_eq!(report.internal_links.broken.len(), 1);
    assert_eq!(report.external_links.broken.len(), 1);
}

#[tokio::test]
async fn test_finished_audit_is_not_rerun() {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(create_test_config(&dir));
    let store = create_store(&config);

    let audit_id = store
        .lock()
        .unwrap()
        .create_audit(&NewAudit {
            url: "localhost".to_string(),
            ..Default::default()
        })
        .unwrap();

    let orchestrator = Orchestrator::new(Arc::clone(&config), store.clone()).unwrap();
    assert_eq!(
        orchestrator.run_audit(audit_id, "localhost", 10).await,
        AuditStatus::Failed
    );
    let first = store.lock().unwrap().get_audit(audit_id).unwrap();

    // A second run neither changes the status nor rewrites the messages
    assert_eq!(
        orchestrator.run_audit(audit_id, "localhost", 10).await,
        AuditStatus::Failed
    );
    let second = store.lock().unwrap().get_audit(audit_id).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_submit_after_shutdown_marks_audit_error() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let store = create_store(&config);
    let service = AuditService::new(config, store.clone()).unwrap();

    service.shutdown().await.unwrap();
    assert!(service
        .start_audit("https://example.com/", None, None, None)
        .await
        .is_err());

    let errored = store
        .lock()
        .unwrap()
        .list_audits_by_status(AuditStatus::Error)
        .unwrap();
    assert_eq!(errored.len(), 1);
    assert!(errored[0].error_message.is_some());
}
