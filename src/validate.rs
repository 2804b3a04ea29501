use tracing::warn;
use url::Url;

use crate::config::SiteConfig;
use crate::error::{Result, ScrapeError};

/// True when `url` is an absolute URL on one of the site's hosts with a real path.
pub fn is_valid_event_url(url: &str) -> bool {
    match validate_event_url(url, &SiteConfig::eventbrite()) {
        Ok(_) => true,
        Err(e) => {
            warn!("Invalid Eventbrite URL: {url} ({e})");
            false
        }
    }
}

pub fn validate_event_url(url: &str, site: &SiteConfig) -> Result<Url> {
    let invalid = |reason: &str| ScrapeError::Validation {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let raw = url.trim();
    let parsed = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if parsed.scheme().is_empty() || parsed.host_str().is_none() {
        return Err(invalid("url has no host"));
    }

    // The url crate normalises case, default ports and an empty path, so the
    // host and path checks read the text as typed.
    let (netloc, path) = split_authority(raw).ok_or_else(|| invalid("url has no host"))?;
    if !site.allowed_hosts.contains(&netloc) {
        return Err(invalid("domain not in whitelist"));
    }
    if path.is_empty() {
        return Err(invalid("url has no path"));
    }

    Ok(parsed)
}

/// Netloc and path exactly as written: `https://Host:443/a?b` gives `("Host:443", "/a")`.
fn split_authority(raw: &str) -> Option<(&str, &str)> {
    let (_, rest) = raw.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (netloc, tail) = rest.split_at(end);
    let path_end = tail.find(['?', '#']).unwrap_or(tail.len());
    Some((netloc, &tail[..path_end]))
}
