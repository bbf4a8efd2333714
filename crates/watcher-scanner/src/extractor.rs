//! Mode-selected extraction over a detached page snapshot.

use scraper::Html;
use std::time::Duration;
use watcher_browser::WaitStrategy;
use watcher_core::{NavigationConfig, PageSnapshot, ScanMode, ScanPayload};

/// One extraction strategy per [`ScanMode`].
///
/// Besides turning a snapshot into a payload, an extractor decides how the
/// page is loaded for it: how long navigation may take, what counts as
/// loaded, how long client-side rendering gets, and which element must be
/// present before the snapshot is worth taking.
pub trait Extractor: Send + Sync {
    fn mode(&self) -> ScanMode;

    fn wait_strategy(&self, navigation: &NavigationConfig) -> WaitStrategy;

    fn navigation_timeout(&self, navigation: &NavigationConfig) -> Duration;

    fn settle_delay(&self, navigation: &NavigationConfig) -> Duration;

    /// Selector waited for after settling; a timeout fails the scan.
    fn ready_selector(&self) -> Option<&str> {
        None
    }

    fn extract(&self, snapshot: &PageSnapshot) -> ScanPayload;
}

/// Collapse runs of whitespace, including newlines, to single spaces.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text a visitor would see: every text node outside script-like elements.
pub(crate) fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor.value().as_element().is_some_and(|el| {
                matches!(el.name(), "script" | "style" | "noscript" | "template")
            })
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}
