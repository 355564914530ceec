//! False-positive suppression for link errors
//!
//! Many sites answer automated requests with 4xx/5xx even though a browser
//! would load the page fine. Error results for URLs matching these rules are
//! dropped from reports. Unreachable results are never dropped.

use super::model::LinkStatus;
use crate::url::matches_wildcard;
use serde::Serialize;
use url::Url;

/// Path segments that usually sit behind a login
const AUTH_PATH_SEGMENTS: &[&str] = &[
    "login",
    "log-in",
    "signin",
    "sign-in",
    "logout",
    "admin",
    "wp-admin",
    "wp-login.php",
    "dashboard",
    "account",
    "my-account",
    "auth",
    "oauth",
    "sso",
];

/// Subdomain labels that usually serve authentication
const AUTH_SUBDOMAINS: &[&str] = &["account", "accounts", "sso", "login", "auth", "id", "my"];

/// Platforms that routinely block non-browser clients
const BOT_HOSTILE_PLATFORMS: &[&str] = &[
    "linkedin.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "tiktok.com",
    "pinterest.com",
    "quora.com",
    "glassdoor.com",
    "indeed.com",
    "crunchbase.com",
    "yelp.com",
];

/// Marketing, analytics and tracking hosts
const TRACKING_DOMAINS: &[&str] = &[
    "google-analytics.com",
    "googletagmanager.com",
    "doubleclick.net",
    "googleadservices.com",
    "facebook.net",
    "hotjar.com",
    "mixpanel.com",
    "segment.io",
    "segment.com",
    "hs-analytics.net",
    "hubspotlinks.com",
    "mailchimp.com",
    "list-manage.com",
    "clarity.ms",
    "bing.com",
];

/// Subdomain labels used by email and ad click trackers
const TRACKING_SUBDOMAINS: &[&str] = &["click", "clicks", "track", "tracking", "links", "email", "trk"];

/// Link shorteners and partner redirect hosts
const REDIRECT_DOMAINS: &[&str] = &[
    "bit.ly", "t.co", "lnkd.in", "goo.gl", "ow.ly", "amzn.to", "buff.ly", "tinyurl.com", "fb.me",
];

/// Path and query fragments typical of partner redirect links
const REDIRECT_PATTERNS: &[&str] = &[
    "/redirect", "/out/", "/go/", "/aff/", "/affiliate", "/click?", "affid=", "aff_id=",
    "partner=", "ref=",
];

/// Subdomain labels of enterprise and intranet hosts
const ENTERPRISE_SUBDOMAINS: &[&str] = &[
    "intranet", "internal", "corp", "vpn", "extranet", "portal", "staff", "employee", "sharepoint",
];

/// Subdomain labels of CDN and asset hosts
const CDN_SUBDOMAINS: &[&str] = &["cdn", "static", "assets", "img", "images", "media", "fonts"];

/// CDN provider hosts
const CDN_DOMAINS: &[&str] = &[
    "cloudfront.net",
    "akamaihd.net",
    "akamaized.net",
    "fastly.net",
    "cdnjs.cloudflare.com",
    "jsdelivr.net",
    "unpkg.com",
];

/// Why a link error was suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FalsePositiveReason {
    AuthGated,
    BotHostilePlatform,
    Tracking,
    PartnerRedirect,
    Enterprise,
    CdnAsset,
    Configured,
}

fn host_matches(host: &str, domains: &[&str]) -> bool {
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}

fn leading_label_in(host: &str, labels: &[&str]) -> bool {
    let host = host.strip_prefix("www.").unwrap_or(host);
    match host.split_once('.') {
        // Only a subdomain label counts, never the registrable name itself
        Some((first, rest)) if rest.contains('.') => labels.contains(&first),
        _ => false,
    }
}

fn has_auth_path(url: &Url) -> bool {
    url.path_segments()
        .map(|mut segments| {
            segments.any(|segment| AUTH_PATH_SEGMENTS.contains(&segment.to_lowercase().as_str()))
        })
        .unwrap_or(false)
}

/// Returns true if the URL is likely to need a logged-in browser session
///
/// Auth paths, auth subdomains and bot-hostile platforms all count.
pub fn is_auth_sensitive(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or_default().to_lowercase();

    has_auth_path(&parsed)
        || leading_label_in(&host, AUTH_SUBDOMAINS)
        || host_matches(&host, BOT_HOSTILE_PLATFORMS)
}

/// Decides which link errors are reported
#[derive(Debug, Clone, Default)]
pub struct FalsePositiveFilter {
    ignore_domains: Vec<String>,
}

impl FalsePositiveFilter {
    /// Creates a filter that also suppresses the given wildcard domain patterns
    pub fn new(ignore_domains: Vec<String>) -> Self {
        Self { ignore_domains }
    }

    /// Returns the rule that matches `url`, if any
    pub fn reason(&self, url: &str) -> Option<FalsePositiveReason> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        let lower = url.to_lowercase();

        if self
            .ignore_domains
            .iter()
            .any(|pattern| matches_wildcard(pattern, &host))
        {
            return Some(FalsePositiveReason::Configured);
        }
        if has_auth_path(&parsed) || leading_label_in(&host, AUTH_SUBDOMAINS) {
            return Some(FalsePositiveReason::AuthGated);
        }
        if host_matches(&host, BOT_HOSTILE_PLATFORMS) {
            return Some(FalsePositiveReason::BotHostilePlatform);
        }
        if host_matches(&host, TRACKING_DOMAINS) || leading_label_in(&host, TRACKING_SUBDOMAINS) {
            return Some(FalsePositiveReason::Tracking);
        }
        if host_matches(&host, REDIRECT_DOMAINS)
            || REDIRECT_PATTERNS.iter().any(|p| lower.contains(p))
        {
            return Some(FalsePositiveReason::PartnerRedirect);
        }
        if leading_label_in(&host, ENTERPRISE_SUBDOMAINS) {
            return Some(FalsePositiveReason::Enterprise);
        }
        if host_matches(&host, CDN_DOMAINS) || leading_label_in(&host, CDN_SUBDOMAINS) {
            return Some(FalsePositiveReason::CdnAsset);
        }
        None
    }

    /// Returns true if a result should be left out of the report
    pub fn is_suppressed(&self, url: &str, status: LinkStatus) -> bool {
        match status {
            LinkStatus::Unreachable => false,
            LinkStatus::Http(code) if code >= 400 => self.reason(url).is_some(),
            LinkStatus::Http(_) => false,
        }
    }
}
