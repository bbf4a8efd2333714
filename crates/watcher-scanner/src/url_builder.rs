use crate::error::{Result, ScanError};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;
use watcher_core::{ExtractionConfig, ScanMode, ScanRequest};

/// Turn a request target into the absolute URL the browser loads.
pub fn build_target_url(request: &ScanRequest, config: &ExtractionConfig) -> Result<String> {
    match request.mode {
        ScanMode::ZipSearch => build_search_url(&request.target, &config.listing_search_template),
        ScanMode::UrlAnalyze => normalize_site_url(&request.target),
    }
}

/// Fill the listing search template with a postal code.
pub fn build_search_url(zip: &str, template: &str) -> Result<String> {
    static ZIP_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = ZIP_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 \-]{0,15}$").expect("valid regex"));

    let zip = zip.trim();
    if !regex.is_match(zip) {
        return Err(invalid(zip, "postal code must be alphanumeric"));
    }

    let url = template.replace("{zip}", &zip.replace(' ', "%20"));
    Url::parse(&url)
        .map(String::from)
        .map_err(|e| invalid(zip, &format!("search template produced a bad URL: {e}")))
}

/// Prefix `https://` when no scheme is given and require an absolute URL.
pub fn normalize_site_url(target: &str) -> Result<String> {
    let target = target.trim();
    if target.is_empty() {
        return Err(invalid(target, "empty URL"));
    }

    let has_scheme = ["http://", "https://"].iter().any(|scheme| {
        target
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    });
    let candidate = if has_scheme {
        target.to_string()
    } else {
        format!("https://{target}")
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(target, &e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(target, "URL has no host"));
    }
    Ok(url.into())
}

fn invalid(target: &str, reason: &str) -> ScanError {
    ScanError::InvalidTarget {
        target: target.to_string(),
        reason: reason.to_string(),
    }
}
