use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_audit::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the key used to group requests by domain
///
/// This is the lowercase host, followed by `:port` when the URL carries an
/// explicit non-default port. Two servers on the same host but different
/// ports are treated as different domains.
pub fn domain_key(url: &Url) -> String {
    let host = extract_domain(url).unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

/// Like [`domain_key`], for a raw URL string
///
/// Unparseable strings are grouped under their own text.
pub fn domain_key_str(url: &str) -> String {
    Url::parse(url)
        .map(|u| domain_key(&u))
        .unwrap_or_else(|_| url.to_string())
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Checks whether `candidate` belongs to the audited site
///
/// A URL is internal when its host equals the site host or is a subdomain of
/// it (ignoring a leading `www.` on either side) and it is served on the same
/// port.
pub fn is_internal_url(candidate: &Url, site: &Url) -> bool {
    let (Some(candidate_host), Some(site_host)) =
        (extract_domain(candidate), extract_domain(site))
    else {
        return false;
    };

    if candidate.port_or_known_default() != site.port_or_known_default() {
        return false;
    }

    let candidate_host = strip_www(&candidate_host);
    let site_host = strip_www(&site_host);

    candidate_host == site_host || candidate_host.ends_with(&format!(".{}", site_host))
}
