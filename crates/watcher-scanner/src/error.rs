use std::time::Duration;
use thiserror::Error;
use watcher_browser::BrowserError;

/// Engine-level failures. Each one ends the scan as `FAILED`.
///
/// A listing card missing a sub-node is not an error; the extractors report
/// it as absent data.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("target {url} responded with HTTP {status}")]
    UpstreamHttpError { url: String, status: u16 },

    #[error("connection failed: {0}")]
    ConnectionFailure(String),

    #[error("session teardown failed: {0}")]
    TeardownFailure(String),

    #[error("no element matching {selector} appeared within {timeout:?}")]
    SelectorTimeout { selector: String, timeout: Duration },

    #[error("invalid pattern for {name}: {reason}")]
    InvalidSignature { name: String, reason: String },

    #[error("admission gate closed")]
    AdmissionClosed,

    #[error("browser error: {0}")]
    Browser(BrowserError),
}

impl From<BrowserError> for ScanError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::NavigationTimeout { url, timeout } => {
                Self::NavigationTimeout { url, timeout }
            }
            BrowserError::UpstreamHttp { url, status } => Self::UpstreamHttpError { url, status },
            BrowserError::Connection(reason) => Self::ConnectionFailure(reason),
            BrowserError::Teardown(reason) => Self::TeardownFailure(reason),
            other => Self::Browser(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_errors_fold_into_taxonomy() {
        let err: ScanError = BrowserError::UpstreamHttp {
            url: "https://acme.test/".to_string(),
            status: 404,
        }
        .into();
        assert!(matches!(err, ScanError::UpstreamHttpError { status: 404, .. }));

        let err: ScanError =
            BrowserError::Connection("net::ERR_NAME_NOT_RESOLVED".to_string()).into();
        assert!(matches!(err, ScanError::ConnectionFailure(_)));

        let err: ScanError = BrowserError::Launch("no chromium".to_string()).into();
        assert!(matches!(err, ScanError::Browser(BrowserError::Launch(_))));
    }

    #[test]
    fn test_timeout_display() {
        let err = ScanError::NavigationTimeout {
            url: "https://slow.test/".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "navigation to https://slow.test/ timed out after 30s"
        );
    }
}
