use std::time::{Duration, Instant};

/// Tracks request pacing for one domain during link verification
///
/// Each verification chunk owns its own set of domain states, so pacing
/// is enforced per chunk.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests made to this domain so far
    pub request_count: u32,

    /// Timestamp of the last request to this domain
    pub last_request_time: Option<Instant>,

    /// Whether this domain has answered HTTP 429
    pub rate_limited: bool,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a request can be made to this domain right now
    ///
    /// # Arguments
    ///
    /// * `delay` - Minimum spacing between requests to the same domain
    /// * `now` - The current time instant
    pub fn can_request(&self, delay: Duration, now: Instant) -> bool {
        self.time_until_next_request(delay, now).is_none()
    }

    /// Records that a request was made to this domain
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Marks this domain as rate limited
    ///
    /// A rate-limited domain is spaced out at twice the normal delay.
    pub fn mark_rate_limited(&mut self) {
        self.rate_limited = true;
    }

    /// Reserves the next request slot and returns when it opens
    ///
    /// Concurrent callers each get a distinct slot spaced `delay` apart.
    pub fn reserve_slot(&mut self, delay: Duration, now: Instant) -> Instant {
        let delay = if self.rate_limited { delay * 2 } else { delay };
        let ready = match self.last_request_time {
            Some(last) => (last + delay).max(now),
            None => now,
        };
        self.record_request(ready);
        ready
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let delay = if self.rate_limited { delay * 2 } else { delay };
        let last = self.last_request_time?;
        let elapsed = now.duration_since(last);
        if elapsed < delay {
            Some(delay - elapsed)
        } else {
            None
        }
    }
}
