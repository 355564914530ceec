//! Site-Audit main entry point
//!
//! This is the command-line interface for the Site-Audit pipeline.

use anyhow::{bail, Context};
use clap::Parser;
use site_audit::config::{load_config_with_hash, Config};
use site_audit::output::write_markdown_report;
use site_audit::storage::{open_storage, shared, AuditRecord};
use site_audit::AuditService;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Site-Audit: a website structural audit pipeline
///
/// Crawls a site, checks titles, meta descriptions, and H1 headings, and
/// verifies every discovered link. Results are stored per audit and can be
/// delivered to a webhook.
#[derive(Parser, Debug)]
#[command(name = "site-audit")]
#[command(version = "1.0.0")]
#[command(about = "A website structural audit pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Site to audit
    #[arg(value_name = "URL", required_unless_present_any = ["show", "dry_run"])]
    url: Option<String>,

    /// Maximum number of pages to crawl (defaults to the configured limit)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Requester id stored with the audit
    #[arg(long)]
    user_id: Option<String>,

    /// Request id stored with the audit
    #[arg(long)]
    request_id: Option<String>,

    /// Print a stored audit and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["url", "dry_run"])]
    show: Option<i64>,

    /// Also write the report as markdown
    #[arg(long, value_name = "PATH")]
    markdown: Option<PathBuf>,

    /// Validate config and exit
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.json_logs);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let audit = if let Some(audit_id) = cli.show {
        handle_show(&config, audit_id)?
    } else {
        let url = cli.url.as_deref().context("URL is required")?;
        handle_audit(config, url, &cli).await?
    };

    println!("{}", serde_json::to_string_pretty(&audit)?);

    if let Some(path) = &cli.markdown {
        write_markdown_report(&audit, path)
            .with_context(|| format!("Failed to write markdown to {}", path.display()))?;
        tracing::info!("Markdown report written to {}", path.display());
    }

    if audit.status.is_failure() {
        bail!(
            "Audit {} ended as {}: {}",
            audit.id,
            audit.status,
            audit.error_message.as_deref().unwrap_or("no message")
        );
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, json: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_audit=info,warn"),
            1 => EnvFilter::new("site_audit=debug,info"),
            2 => EnvFilter::new("site_audit=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    if json {
        builder.json().with_current_span(true).init();
    } else {
        builder.init();
    }
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Site-Audit Dry Run ===\n");

    println!("Crawler:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  User agent: {}", config.user_agent_string());

    println!("\nVerifier:");
    println!("  Max URLs: {}", config.verifier.max_urls);
    println!(
        "  Chunks: {} URLs, {} concurrent, {}s each, {}s overall",
        config.verifier.chunk_size,
        config.verifier.max_concurrent_chunks,
        config.verifier.chunk_timeout_secs,
        config.verifier.overall_timeout_secs
    );
    println!("  Ignored domains: {}", config.verifier.ignore_domains.len());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Work dir: {}", config.storage.work_dir);

    match &config.notifier {
        Some(notifier) => println!("\nWebhook: {}", notifier.callback_url),
        None => println!("\nWebhook: disabled"),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --show mode: loads a stored audit
fn handle_show(config: &Config, audit_id: i64) -> anyhow::Result<AuditRecord> {
    use site_audit::storage::AuditStore;

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    Ok(storage.get_audit(audit_id)?)
}

/// Runs one audit to completion
async fn handle_audit(config: Config, url: &str, cli: &Cli) -> anyhow::Result<AuditRecord> {
    let store = shared(open_storage(Path::new(&config.storage.database_path))?);
    let service = AuditService::new(config, store)?;

    let audit_id = service
        .start_audit(url, cli.max_pages, cli.user_id.clone(), cli.request_id.clone())
        .await?;
    tracing::info!("Started audit {} for {}", audit_id, url);

    // Shutdown drains the queue, so the audit is finished afterwards
    service.shutdown().await?;

    Ok(service.get_audit(audit_id)?)
}
