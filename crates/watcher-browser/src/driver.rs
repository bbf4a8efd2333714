use crate::error::Result;
use crate::filter::ResourceFilter;
use crate::stealth::{StealthProfile, LAUNCH_ARGS};
use std::path::PathBuf;
use std::time::Duration;
use watcher_core::BrowserConfig;

/// Process-level launch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub args: Vec<String>,
}

impl LaunchOptions {
    #[must_use]
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            chrome_executable: config.chrome_executable.clone(),
            window_width: config.window_width,
            window_height: config.window_height,
            args: LAUNCH_ARGS.iter().map(|arg| (*arg).to_string()).collect(),
        }
    }
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}

/// How long navigation waits before the page counts as loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Return once the DOM is constructed.
    DomContentLoaded,
    /// After the DOM is constructed, wait until no new network activity has
    /// been seen for `quiet`, giving up quietly after `max_wait`.
    NetworkIdle { quiet: Duration, max_wait: Duration },
}

/// What navigation observed about the main document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResponse {
    pub final_url: String,
    /// `None` when the main document response was not observed.
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
}

/// Starts browser processes.
#[async_trait::async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Launch an isolated browser process.
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserHandle>>;
}

/// One launched browser, exclusively owned by a single scan.
#[async_trait::async_trait]
pub trait BrowserHandle: Send {
    /// Create an isolated browsing context and its page.
    async fn new_context(&mut self, profile: &StealthProfile, filter: &ResourceFilter)
        -> Result<()>;

    /// Navigate the page. Timeouts are enforced by the caller.
    async fn navigate(&mut self, url: &str, wait: WaitStrategy) -> Result<NavigationResponse>;

    /// Wait for a selector to appear; `Ok(false)` when it never does.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Serialized DOM of the current page.
    async fn content(&mut self) -> Result<String>;

    /// Shut the browser down.
    async fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_from_config() {
        let config = BrowserConfig {
            headless: false,
            chrome_executable: Some(PathBuf::from("/usr/bin/chromium")),
            ..BrowserConfig::default()
        };
        let options = LaunchOptions::from_config(&config);
        assert!(!options.headless);
        assert_eq!(
            options.chrome_executable.as_deref(),
            Some(std::path::Path::new("/usr/bin/chromium"))
        );
        assert!(options.args.iter().any(|a| a == "--no-sandbox"));
    }
}
