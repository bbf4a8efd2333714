//! Shared types used across the Watcher engine.
//!
//! These are the values that cross crate boundaries: the request handed in
//! by the routing layer, the page snapshot produced by a browser session,
//! the extracted records, and the result handed back.

use crate::error::WatcherError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Placeholder stored when a listing card has no square-footage node.
pub const SQFT_FALLBACK: &str = "N/A";

/// Placeholder stored when a listing card has no days-on-market node.
pub const DAYS_ON_MARKET_FALLBACK: &str = "New";

/// Most listing cards a single search result may carry.
pub const MAX_LISTINGS: usize = 10;

/// Which kind of scan a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanMode {
    /// Postal code mapped into the real-estate search template.
    ZipSearch,
    /// Arbitrary business website analysed for lead signals.
    UrlAnalyze,
}

impl ScanMode {
    /// Wire name of the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZipSearch => "ZIP_SEARCH",
            Self::UrlAnalyze => "URL_ANALYZE",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanMode {
    type Err = WatcherError;

    /// Accepts the wire names as well as the short `zip` / `url` forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zip_search" | "zip" => Ok(Self::ZipSearch),
            "url_analyze" | "url" => Ok(Self::UrlAnalyze),
            other => Err(WatcherError::Validation(format!(
                "unknown scan mode '{other}'"
            ))),
        }
    }
}

/// A single scan request as received from the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Postal code or website, depending on `mode`.
    pub target: String,
    /// Selects target URL construction and the extractor.
    pub mode: ScanMode,
}

impl ScanRequest {
    /// Create a new request.
    pub fn new(target: impl Into<String>, mode: ScanMode) -> Self {
        Self {
            target: target.into(),
            mode,
        }
    }

    /// Shorthand for a `ZIP_SEARCH` request.
    pub fn zip_search(zip: impl Into<String>) -> Self {
        Self::new(zip, ScanMode::ZipSearch)
    }

    /// Shorthand for a `URL_ANALYZE` request.
    pub fn url_analyze(url: impl Into<String>) -> Self {
        Self::new(url, ScanMode::UrlAnalyze)
    }
}

/// The rendered state of a page, captured once after navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    /// URL after redirects.
    pub final_url: String,
    /// Status of the main document response.
    pub http_status: u16,
    /// Serialized DOM after client-side rendering.
    pub rendered_html: String,
    /// Main document response headers, names lower-cased.
    pub headers: Vec<(String, String)>,
}

impl PageSnapshot {
    /// Headers rendered as `name: value` lines for pattern matching.
    #[must_use]
    pub fn header_text(&self) -> String {
        self.headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether the page was served over HTTPS.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.final_url
            .get(..8)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
    }
}

/// One property card from a listing search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub address: String,
    pub price: String,
    /// `"N/A"` when the card has no square-footage node.
    pub square_footage: String,
    /// `"New"` when the card has no days-on-market node.
    pub days_on_market: String,
}

/// A technology detected on a page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    pub category: String,
}

impl Technology {
    /// Create a new technology entry.
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

/// Lead signals mined from a business website.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalBundle {
    pub detected_technologies: BTreeSet<Technology>,
    pub hiring_signal: bool,
    /// Matched growth keywords in vocabulary order, without duplicates.
    pub growth_signals: Vec<String>,
    /// Platform name to the first matching profile fragment. Platforms
    /// without a match are absent.
    pub social_profiles: BTreeMap<String, String>,
    /// Lower-cased, deduplicated, capped; first-appearance order.
    pub emails: Vec<String>,
    pub stale_website: bool,
    pub missing_h1: bool,
    pub https_enabled: bool,
}

impl SignalBundle {
    /// Whether the named technology was detected.
    #[must_use]
    pub fn has_technology(&self, name: &str) -> bool {
        self.detected_technologies.iter().any(|t| t.name == name)
    }
}

/// Outcome of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    Success,
    Failed,
}

/// Mode-specific extraction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanPayload {
    Listings(Vec<ListingRecord>),
    Signals(SignalBundle),
}

impl ScanPayload {
    /// The payload a failed scan of `mode` carries.
    #[must_use]
    pub fn empty(mode: ScanMode) -> Self {
        match mode {
            ScanMode::ZipSearch => Self::Listings(Vec::new()),
            ScanMode::UrlAnalyze => Self::Signals(SignalBundle::default()),
        }
    }

    /// Listing records, if this is a listing payload.
    #[must_use]
    pub fn listings(&self) -> Option<&[ListingRecord]> {
        match self {
            Self::Listings(records) => Some(records),
            Self::Signals(_) => None,
        }
    }

    /// Signal bundle, if this is a signal payload.
    #[must_use]
    pub fn signals(&self) -> Option<&SignalBundle> {
        match self {
            Self::Signals(bundle) => Some(bundle),
            Self::Listings(_) => None,
        }
    }
}

/// Result of one scan. Built once and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    status: ScanStatus,
    target: String,
    lead_score: u8,
    payload: ScanPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
}

impl ScanResult {
    /// Highest score a result can carry.
    pub const MAX_SCORE: u8 = 100;

    /// A successful scan. Scores above 100 are clamped.
    pub fn success(target: impl Into<String>, payload: ScanPayload, lead_score: u8) -> Self {
        Self {
            status: ScanStatus::Success,
            target: target.into(),
            lead_score: lead_score.min(Self::MAX_SCORE),
            payload,
            error_detail: None,
        }
    }

    /// A failed scan with an empty payload of the mode's shape.
    pub fn failed(target: impl Into<String>, mode: ScanMode, detail: impl Into<String>) -> Self {
        Self {
            status: ScanStatus::Failed,
            target: target.into(),
            lead_score: 0,
            payload: ScanPayload::empty(mode),
            error_detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub fn status(&self) -> ScanStatus {
        self.status
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ScanStatus::Success
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn lead_score(&self) -> u8 {
        self.lead_score
    }

    #[must_use]
    pub fn payload(&self) -> &ScanPayload {
        &self.payload
    }

    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    /// Transport status the routing layer maps this result to.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self.status {
            ScanStatus::Success => 200,
            ScanStatus::Failed => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_mode_parsing() {
        assert_eq!("ZIP_SEARCH".parse::<ScanMode>().unwrap(), ScanMode::ZipSearch);
        assert_eq!("url".parse::<ScanMode>().unwrap(), ScanMode::UrlAnalyze);
        assert!("crawl".parse::<ScanMode>().is_err());
    }

    #[test]
    fn test_scan_mode_serialization() {
        let json = serde_json::to_string(&ScanMode::UrlAnalyze).unwrap();
        assert_eq!(json, "\"URL_ANALYZE\"");
        let request: ScanRequest =
            serde_json::from_str(r#"{"target":"90210","mode":"ZIP_SEARCH"}"#).unwrap();
        assert_eq!(request, ScanRequest::zip_search("90210"));
    }

    #[test]
    fn test_snapshot_header_text() {
        let snapshot = PageSnapshot {
            final_url: "https://acme.test/".to_string(),
            http_status: 200,
            rendered_html: String::new(),
            headers: vec![
                ("server".to_string(), "cloudflare".to_string()),
                ("cf-ray".to_string(), "abc123".to_string()),
            ],
        };
        assert_eq!(snapshot.header_text(), "server: cloudflare\ncf-ray: abc123");
        assert!(snapshot.is_https());
    }

    #[test]
    fn test_snapshot_plain_http() {
        let snapshot = PageSnapshot {
            final_url: "http://acme.test/".to_string(),
            http_status: 200,
            rendered_html: String::new(),
            headers: Vec::new(),
        };
        assert!(!snapshot.is_https());
    }

    #[test]
    fn test_failed_result_shape() {
        let result = ScanResult::failed("acme.test", ScanMode::UrlAnalyze, "navigation timed out");
        assert_eq!(result.status(), ScanStatus::Failed);
        assert_eq!(result.lead_score(), 0);
        assert_eq!(result.error_detail(), Some("navigation timed out"));
        assert_eq!(result.payload().signals(), Some(&SignalBundle::default()));
        assert_eq!(result.http_status(), 400);

        let result = ScanResult::failed("90210", ScanMode::ZipSearch, "unreachable");
        assert_eq!(result.payload().listings().map(<[_]>::len), Some(0));
    }

    #[test]
    fn test_success_result_clamps_score() {
        let result =
            ScanResult::success("acme.test", ScanPayload::empty(ScanMode::UrlAnalyze), 250);
        assert_eq!(result.lead_score(), 100);
        assert!(result.is_success());
        assert_eq!(result.http_status(), 200);
        assert!(result.error_detail().is_none());
    }

    #[test]
    fn test_result_serialization() {
        let payload = ScanPayload::Listings(vec![ListingRecord {
            address: "1 Main St".to_string(),
            price: "$500,000".to_string(),
            square_footage: SQFT_FALLBACK.to_string(),
            days_on_market: DAYS_ON_MARKET_FALLBACK.to_string(),
        }]);
        let result = ScanResult::success("90210", payload, 0);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["status"], "SUCCESS");
        assert_eq!(value["payload"][0]["square_footage"], "N/A");
        assert_eq!(value["payload"][0]["days_on_market"], "New");
        assert!(value.get("error_detail").is_none());
    }
}
