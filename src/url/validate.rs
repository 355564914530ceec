use crate::UrlError;
use url::Url;

/// Validates and parses the URL an audit was requested for
///
/// # Validation Steps
///
/// 1. Trim whitespace; reject if empty
/// 2. Prepend `http://` when no http(s) scheme is present
/// 3. Parse the URL; reject if malformed
/// 4. Require an http or https scheme and a non-empty host
/// 5. Host may only contain ASCII letters, digits, `.` and `-`
/// 6. Host must contain a `.` and may not start or end with one
///
/// # Examples
///
/// ```
/// use site_audit::url::validate_audit_url;
///
/// let url = validate_audit_url("example.com").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/");
/// assert!(validate_audit_url("localhost").is_err());
/// ```
pub fn validate_audit_url(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("URL cannot be empty".to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "URL must use http:// or https://, got {}",
            url.scheme()
        )));
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => return Err(UrlError::MissingDomain),
    };

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(UrlError::InvalidHost(host.to_string()));
    }

    if !host.contains('.') || host.starts_with('.') || host.ends_with('.') {
        return Err(UrlError::InvalidHost(host.to_string()));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_full_urls() {
        let url = validate_audit_url("https://example.com/page").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(validate_audit_url("http://127.0.0.1:8080/").is_ok());
    }

    #[test]
    fn test_prepends_scheme() {
        let url = validate_audit_url("  blog.example.com/path ").unwrap();
        assert_eq!(url.as_str(), "http://blog.example.com/path");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(validate_audit_url("   "), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_rejects_host_without_dot() {
        assert!(matches!(
            validate_audit_url("http://localhost/"),
            Err(UrlError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_rejects_bad_characters() {
        assert!(validate_audit_url("http://exa_mple.com/").is_err());
        assert!(validate_audit_url("http://exa mple.com/").is_err());
    }

    #[test]
    fn test_rejects_trailing_dot() {
        assert!(validate_audit_url("http://example.com./").is_err());
        assert!(validate_audit_url("http://.example.com/").is_err());
    }

    #[test]
    fn test_error_messages_mention_url() {
        let err = validate_audit_url("http://localhost/").unwrap_err();
        assert!(err.to_string().to_lowercase().contains("invalid url"));
    }
}
