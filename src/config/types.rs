use serde::Deserialize;

/// Main configuration structure for Site-Audit
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub notifier: Option<NotifierConfig>,
}

impl Config {
    /// Builds the User-Agent header value sent with every request
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.user_agent.crawler_name,
            self.user_agent.crawler_version,
            self.user_agent.contact_url
        )
    }
}

/// Built-in crawler configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Page budget used when an audit request does not carry one
    pub max_pages: u32,

    /// Maximum link depth from the start URL
    pub max_depth: u32,

    /// Per-page fetch timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            max_depth: 5,
            request_timeout_secs: 10,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory under which per-audit scratch directories are created
    #[serde(rename = "work-dir")]
    pub work_dir: String,
}

/// Pre-flight validation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ValidationConfig {
    /// Bound on the primary DNS lookup before falling back
    pub dns_timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            dns_timeout_secs: 15,
        }
    }
}

/// External-link verification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VerifierConfig {
    /// Hard cap on unique URLs verified per audit
    pub max_urls: usize,

    /// Maximum URLs per chunk
    pub chunk_size: usize,

    /// Chunks allowed to run at the same time
    pub max_concurrent_chunks: usize,

    /// Requests a single chunk keeps in flight
    pub in_flight_per_chunk: usize,

    pub chunk_timeout_secs: u64,
    pub overall_timeout_secs: u64,

    /// Per-request timeout; doubled under the gentle profile
    pub request_timeout_secs: u64,

    pub gentle_delay_ms: u64,
    pub conservative_delay_ms: u64,
    pub aggressive_delay_ms: u64,

    /// Extra attempts per request under the gentle profile
    pub gentle_retries: u32,

    /// Additional domain patterns ("example.com" or "*.example.com") whose
    /// error results are always suppressed
    pub ignore_domains: Vec<String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_urls: 100,
            chunk_size: 20,
            max_concurrent_chunks: 3,
            in_flight_per_chunk: 4,
            chunk_timeout_secs: 300,
            overall_timeout_secs: 600,
            request_timeout_secs: 10,
            gentle_delay_ms: 3000,
            conservative_delay_ms: 2000,
            aggressive_delay_ms: 1000,
            gentle_retries: 2,
            ignore_domains: Vec::new(),
        }
    }
}

/// Audit worker pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

/// Webhook delivery configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotifierConfig {
    pub callback_url: String,
    pub api_key: String,

    /// Base backoff; attempt `n` waits `retry_base_ms * 2^n`
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_notifier_workers")]
    pub workers: usize,

    #[serde(default = "default_notifier_queue")]
    pub queue_capacity: usize,

    #[serde(default = "default_notifier_timeout")]
    pub request_timeout_secs: u64,
}

fn default_retry_base_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_notifier_workers() -> usize {
    1
}

fn default_notifier_queue() -> usize {
    128
}

fn default_notifier_timeout() -> u64 {
    30
}
