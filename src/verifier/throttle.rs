//! Per-host request throttling inside a chunk

use crate::state::DomainState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug)]
struct HostSlot {
    permits: Arc<Semaphore>,
    pacing: DomainState,
}

/// Limits concurrency and request spacing per host
///
/// Holding the permit returned by [`DomainThrottle::acquire`] keeps one of
/// the host's concurrency slots busy.
#[derive(Debug)]
pub struct DomainThrottle {
    delay: Duration,
    per_domain: usize,
    hosts: Mutex<HashMap<String, HostSlot>>,
}

impl DomainThrottle {
    pub fn new(delay: Duration, per_domain: usize) -> Self {
        Self {
            delay,
            per_domain: per_domain.max(1),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn with_host<T>(&self, host: &str, f: impl FnOnce(&mut HostSlot) -> T) -> T {
        let mut hosts = self.hosts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = hosts.entry(host.to_string()).or_insert_with(|| HostSlot {
            permits: Arc::new(Semaphore::new(self.per_domain)),
            pacing: DomainState::new(),
        });
        f(slot)
    }

    /// Waits for a concurrency slot and the next paced start time for `host`
    pub async fn acquire(&self, host: &str) -> Option<OwnedSemaphorePermit> {
        let permits = self.with_host(host, |slot| Arc::clone(&slot.permits));
        let permit = permits.acquire_owned().await.ok()?;

        let ready = self.with_host(host, |slot| slot.pacing.reserve_slot(self.delay, Instant::now()));
        tokio::time::sleep_until(ready.into()).await;
        Some(permit)
    }

    /// Doubles the spacing for a host that answered 429
    pub fn mark_rate_limited(&self, host: &str) {
        self.with_host(host, |slot| {
            if !slot.pacing.rate_limited {
                tracing::debug!(host, "Host is rate limiting, slowing down");
            }
            slot.pacing.mark_rate_limited();
        });
    }

    /// Number of requests started for `host`
    pub fn request_count(&self, host: &str) -> u32 {
        self.with_host(host, |slot| slot.pacing.request_count)
    }
}
