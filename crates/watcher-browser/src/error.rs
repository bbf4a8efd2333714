use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("devtools protocol error: {0}")]
    Protocol(String),

    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("{url} responded with HTTP {status}")]
    UpstreamHttp { url: String, status: u16 },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("teardown failed: {0}")]
    Teardown(String),

    #[error("invalid session transition from {from} to {to}")]
    InvalidState {
        from: &'static str,
        to: &'static str,
    },
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::UpstreamHttp {
            url: "https://acme.test/".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "https://acme.test/ responded with HTTP 503");
    }

    #[test]
    fn test_timeout_error() {
        let err = BrowserError::NavigationTimeout {
            url: "https://acme.test/".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
    }
}
