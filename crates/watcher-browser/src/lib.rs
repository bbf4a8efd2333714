//! Headless browser sessions for the Watcher engine.
//!
//! Provides the stealth profile and resource filter applied to every
//! browsing context, the [`BrowserDriver`] seam with its Chromium
//! implementation, and the [`BrowserSession`] lifecycle that guarantees
//! teardown on every exit path.

pub mod chromium;
pub mod driver;
pub mod error;
pub mod filter;
pub mod session;
pub mod stealth;

pub use chromium::ChromiumDriver;
pub use driver::{BrowserDriver, BrowserHandle, LaunchOptions, NavigationResponse, WaitStrategy};
pub use error::{BrowserError, Result};
pub use filter::{FilterDecision, ResourceFilter, ResourceKind};
pub use session::{BrowserSession, SessionState};
pub use stealth::StealthProfile;
