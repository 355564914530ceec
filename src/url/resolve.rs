use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

/// Resolves a host name to its addresses
#[async_trait]
pub trait DomainResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by tokio's asynchronous lookup
#[derive(Debug, Default, Clone)]
pub struct SystemResolver;

#[async_trait]
impl DomainResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Resolver backed by the blocking libc lookup, run off the runtime
///
/// Used as the second opinion when the primary lookup times out.
#[derive(Debug, Default, Clone)]
pub struct BlockingResolver;

#[async_trait]
impl DomainResolver for BlockingResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let host = host.to_string();
        tokio::task::spawn_blocking(move || {
            (host.as_str(), 0)
                .to_socket_addrs()
                .map(|addrs| addrs.map(|addr| addr.ip()).collect())
        })
        .await
        .map_err(io::Error::other)?
    }
}

/// Pre-flight check that an audited host exists in DNS
///
/// The primary lookup is bounded by `timeout`. On timeout the fallback
/// resolver is consulted once, without a bound of its own beyond the OS.
#[derive(Clone)]
pub struct DnsCheck {
    primary: Arc<dyn DomainResolver>,
    fallback: Arc<dyn DomainResolver>,
    timeout: Duration,
}

impl DnsCheck {
    /// Creates a check with the system resolvers
    pub fn new(timeout: Duration) -> Self {
        Self::with_resolvers(Arc::new(SystemResolver), Arc::new(BlockingResolver), timeout)
    }

    /// Creates a check with explicit resolvers
    pub fn with_resolvers(
        primary: Arc<dyn DomainResolver>,
        fallback: Arc<dyn DomainResolver>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    /// Checks that `host` resolves to at least one address
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The host resolved
    /// * `Err(String)` - Why it did not: "does not exist", "has no IP address",
    ///   or "DNS resolution failed" when both resolvers gave up
    pub async fn check(&self, host: &str) -> Result<(), String> {
        match tokio::time::timeout(self.timeout, self.primary.resolve(host)).await {
            Ok(Ok(addrs)) if addrs.is_empty() => {
                Err(format!("Domain '{}' has no IP address", host))
            }
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                tracing::debug!(host, error = %e, "DNS lookup failed");
                Err(format!("Domain '{}' does not exist", host))
            }
            Err(_) => {
                tracing::warn!(
                    host,
                    timeout_secs = self.timeout.as_secs(),
                    "DNS lookup timed out, trying fallback resolver"
                );
                match self.fallback.resolve(host).await {
                    Ok(addrs) if !addrs.is_empty() => Ok(()),
                    Ok(_) => Err(format!("Domain '{}' has no IP address", host)),
                    Err(e) => Err(format!(
                        "DNS resolution failed for '{}': lookup timed out ({})",
                        host, e
                    )),
                }
            }
        }
    }
}

impl std::fmt::Debug for DnsCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsCheck")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
