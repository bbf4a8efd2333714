//! Watcher Scanner - scan orchestration, extraction and lead scoring.
//!
//! This crate turns a [`ScanRequest`](watcher_core::ScanRequest) into a
//! [`ScanResult`](watcher_core::ScanResult). It admits scans through a
//! memory-sized gate, loads the page in a stealth browser session, and runs
//! the extractor selected by the scan mode over the detached snapshot.
//!
//! # Features
//!
//! - Bounded, FIFO admission of concurrent browser sessions
//! - Real-estate listing extraction for postal-code searches
//! - Technology, growth, social, contact and staleness signals for company sites
//! - Configurable weighted lead scoring clamped to 0..=100
//!
//! # Example
//!
//! ```rust,ignore
//! use watcher_core::{AppConfig, ScanRequest};
//! use watcher_scanner::WatcherEngine;
//!
//! let engine = WatcherEngine::chromium(AppConfig::load_with_env()?)?;
//! let result = engine.scan(ScanRequest::url_analyze("acme.com")).await;
//! println!("{} scored {}", result.target(), result.lead_score());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod extractor;
pub mod gate;
#[allow(missing_docs)]
pub mod listing;
pub mod orchestrator;
#[allow(missing_docs)]
pub mod scorer;
#[allow(missing_docs)]
pub mod signals;
#[allow(missing_docs)]
pub mod url_builder;

// Re-export commonly used types
pub use error::{Result, ScanError};
pub use extractor::Extractor;
pub use gate::{AdmissionGate, AdmissionPermit};
pub use listing::ListingExtractor;
pub use orchestrator::WatcherEngine;
pub use scorer::Scorer;
pub use signals::{SignalExtractor, SignalTables, SocialPattern, TechnologySignature};
pub use url_builder::{build_search_url, build_target_url, normalize_site_url};
