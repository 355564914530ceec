//! Webhook delivery of finished audits
//!
//! Deliveries run on their own worker pool, apart from the audit pipeline.
//! Transport failures, 5xx, and 429 are retried with exponential backoff;
//! any other answer ends the delivery. A failed delivery never touches the
//! stored audit.

use crate::config::NotifierConfig;
use crate::crawler::error_chain;
use crate::pipeline::{JobHandler, JobOutcome, WorkerPool};
use crate::storage::AuditRecord;
use crate::AuditError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// One pending webhook delivery
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub audit_id: i64,

    /// Serialized audit snapshot
    pub payload: String,

    /// Zero-based attempt number
    pub attempt: u32,
}

/// Delay before retrying after failed attempt number `attempt`
pub fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

struct DeliveryHandler {
    client: Client,
    callback_url: String,
    api_key: String,
    retry_base: Duration,
    max_attempts: u32,
}

impl DeliveryHandler {
    fn retry(&self, job: DeliveryJob, reason: &str) -> JobOutcome<DeliveryJob> {
        if job.attempt + 1 >= self.max_attempts {
            tracing::error!(
                audit_id = job.audit_id,
                attempts = job.attempt + 1,
                "Giving up on webhook delivery: {}",
                reason
            );
            return JobOutcome::Done;
        }

        let delay = backoff(self.retry_base, job.attempt);
        tracing::warn!(
            audit_id = job.audit_id,
            attempt = job.attempt + 1,
            retry_in_ms = delay.as_millis() as u64,
            "Webhook delivery failed: {}",
            reason
        );
        JobOutcome::RetryAfter(
            delay,
            DeliveryJob {
                attempt: job.attempt + 1,
                ..job
            },
        )
    }
}

#[async_trait]
impl JobHandler<DeliveryJob> for DeliveryHandler {
    async fn handle(&self, job: DeliveryJob) -> JobOutcome<DeliveryJob> {
        let response = self
            .client
            .post(&self.callback_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(job.payload.clone())
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                tracing::info!(
                    audit_id = job.audit_id,
                    attempt = job.attempt + 1,
                    "Webhook delivered"
                );
                JobOutcome::Done
            }
            Ok(response) if is_retryable(response.status()) => {
                let reason = format!("HTTP {}", response.status().as_u16());
                self.retry(job, &reason)
            }
            Ok(response) => {
                tracing::error!(
                    audit_id = job.audit_id,
                    status = response.status().as_u16(),
                    "Webhook rejected delivery, not retrying"
                );
                JobOutcome::Done
            }
            Err(e) => self.retry(job, &error_chain(&e)),
        }
    }
}

/// Queues audit snapshots for webhook delivery
pub struct Notifier {
    pool: WorkerPool<DeliveryJob>,
}

impl Notifier {
    /// Starts the delivery workers
    ///
    /// # Arguments
    ///
    /// * `config` - Webhook target, credentials, and retry policy
    /// * `user_agent` - User agent sent with every delivery
    pub fn new(config: &NotifierConfig, user_agent: &str) -> Result<Self, AuditError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let handler = DeliveryHandler {
            client,
            callback_url: config.callback_url.clone(),
            api_key: config.api_key.clone(),
            retry_base: Duration::from_millis(config.retry_base_ms),
            max_attempts: config.max_attempts.max(1),
        };

        Ok(Self {
            pool: WorkerPool::new(
                "notifier",
                config.workers,
                config.queue_capacity,
                Arc::new(handler),
            ),
        })
    }

    /// Queues a snapshot of `audit` for delivery
    ///
    /// Serialization problems are returned here and never retried.
    pub async fn notify(&self, audit: &AuditRecord) -> Result<(), AuditError> {
        let payload = serde_json::to_string(audit)?;
        self.pool
            .submit(DeliveryJob {
                audit_id: audit.id,
                payload,
                attempt: 0,
            })
            .await
    }

    /// Waits for every queued delivery, including scheduled retries, to
    /// succeed or give up
    pub async fn shutdown(&self) -> Result<(), AuditError> {
        self.pool.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_secs(60);
        assert_eq!(backoff(base, 0), Duration::from_secs(60));
        assert_eq!(backoff(base, 1), Duration::from_secs(120));
        assert_eq!(backoff(base, 4), Duration::from_secs(960));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }
}
