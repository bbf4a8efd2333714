//! Session Manager: one browser and one page per scan.
//!
//! A session walks `Uninitialized -> BrowserLaunched -> ContextReady ->
//! PageNavigated -> Extracting`, drops to `Failed` on any step error, and
//! ends in `Closed`. `close` is reachable from every state and tears the
//! browser down at most once. A session dropped without `close` schedules
//! the teardown on the current runtime instead.

use crate::driver::{BrowserDriver, BrowserHandle, LaunchOptions, NavigationResponse, WaitStrategy};
use crate::error::{BrowserError, Result};
use crate::filter::ResourceFilter;
use crate::stealth::StealthProfile;
use std::fmt;
use std::time::Duration;
use watcher_core::PageSnapshot;

/// Lifecycle position of a [`BrowserSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    BrowserLaunched,
    ContextReady,
    PageNavigated,
    Extracting,
    Failed,
    Closed,
}

impl SessionState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::BrowserLaunched => "browser_launched",
            Self::ContextReady => "context_ready",
            Self::PageNavigated => "page_navigated",
            Self::Extracting => "extracting",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scan's browser session.
pub struct BrowserSession {
    state: SessionState,
    handle: Option<Box<dyn BrowserHandle>>,
    navigation: Option<NavigationResponse>,
}

impl Default for BrowserSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            handle: None,
            navigation: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Start the browser process.
    pub async fn launch(
        &mut self,
        driver: &dyn BrowserDriver,
        options: &LaunchOptions,
    ) -> Result<()> {
        self.expect_state(SessionState::Uninitialized, SessionState::BrowserLaunched)?;
        match driver.launch(options).await {
            Ok(handle) => {
                self.handle = Some(handle);
                self.transition(SessionState::BrowserLaunched);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Create the isolated context, apply the stealth profile and install the filter.
    pub async fn new_context(
        &mut self,
        profile: &StealthProfile,
        filter: &ResourceFilter,
    ) -> Result<()> {
        self.expect_state(SessionState::BrowserLaunched, SessionState::ContextReady)?;
        let outcome = self.handle_mut()?.new_context(profile, filter).await;
        match outcome {
            Ok(()) => {
                self.transition(SessionState::ContextReady);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Load `url` within `timeout`. A main document status of 400 or above fails eagerly.
    pub async fn navigate(
        &mut self,
        url: &str,
        wait: WaitStrategy,
        timeout: Duration,
    ) -> Result<&NavigationResponse> {
        self.expect_state(SessionState::ContextReady, SessionState::PageNavigated)?;
        tracing::debug!("Navigating to {} ({:?}, timeout {:?})", url, wait, timeout);

        let handle = self.handle_mut()?;
        let outcome = match tokio::time::timeout(timeout, handle.navigate(url, wait)).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => return Err(self.fail(e)),
        };
        if let Some(status) = response.status.filter(|s| *s >= 400) {
            return Err(self.fail(BrowserError::UpstreamHttp {
                url: response.final_url,
                status,
            }));
        }

        self.transition(SessionState::PageNavigated);
        let response = self.navigation.insert(response);
        Ok(&*response)
    }

    /// Fixed grace period for client-side rendering after navigation.
    pub async fn settle(&mut self, delay: Duration) -> Result<()> {
        self.expect_state(SessionState::PageNavigated, SessionState::PageNavigated)?;
        if !delay.is_zero() {
            tracing::debug!("Settling for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    /// Wait for `selector`; `Ok(false)` when it does not appear in time.
    pub async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
        self.expect_state(SessionState::PageNavigated, SessionState::PageNavigated)?;
        let outcome = self.handle_mut()?.wait_for_selector(selector, timeout).await;
        outcome.map_err(|e| self.fail(e))
    }

    /// Read the rendered page once and move to `Extracting`.
    pub async fn snapshot(&mut self) -> Result<PageSnapshot> {
        self.expect_state(SessionState::PageNavigated, SessionState::Extracting)?;
        let outcome = self.handle_mut()?.content().await;
        let rendered_html = match outcome {
            Ok(html) => html,
            Err(e) => return Err(self.fail(e)),
        };
        let navigation = self.navigation.take().ok_or(BrowserError::InvalidState {
            from: self.state.as_str(),
            to: SessionState::Extracting.as_str(),
        })?;

        self.transition(SessionState::Extracting);
        Ok(PageSnapshot {
            final_url: navigation.final_url,
            http_status: navigation.status.unwrap_or(200),
            rendered_html,
            headers: navigation.headers,
        })
    }

    /// Tear the session down. Safe to call repeatedly; teardown errors are
    /// logged and swallowed so they never replace the scan's own failure.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.close().await {
                tracing::warn!("Session teardown failed (from {}): {}", self.state, e);
            }
        }
        self.transition(SessionState::Closed);
    }

    fn handle_mut(&mut self) -> Result<&mut Box<dyn BrowserHandle>> {
        let from = self.state.as_str();
        self.handle.as_mut().ok_or(BrowserError::InvalidState {
            from,
            to: "active",
        })
    }

    fn expect_state(&self, required: SessionState, next: SessionState) -> Result<()> {
        if self.state == required {
            Ok(())
        } else {
            Err(BrowserError::InvalidState {
                from: self.state.as_str(),
                to: next.as_str(),
            })
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("Session {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: BrowserError) -> BrowserError {
        tracing::debug!("Session step failed in {}: {}", self.state, err);
        self.transition(SessionState::Failed);
        err
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::warn!("Session dropped in {} without close, tearing down", self.state);
                runtime.spawn(async move {
                    if let Err(e) = handle.close().await {
                        tracing::warn!("Deferred session teardown failed: {}", e);
                    }
                });
            }
            Err(_) => {
                tracing::error!("Session dropped outside a runtime; browser process leaked");
            }
        }
    }
}
