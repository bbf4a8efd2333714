//! Watcher Core - Foundation crate for the Watcher lead-scanning engine.
//!
//! This crate provides shared types, error handling, configuration management,
//! and tracing setup that the browser and scanner crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Scan requests, page snapshots, extracted records and results
//! - [`logging`] - `tracing-subscriber` initialisation
//!
//! # Example
//!
//! ```rust
//! use watcher_core::{AppConfig, ScanMode, ScanRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.admission.capacity(), 2);
//!
//! let request = ScanRequest::new("90210", "zip".parse::<ScanMode>()?);
//! assert_eq!(request.mode, ScanMode::ZipSearch);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod logging;
#[allow(missing_docs)]
pub mod types;

// Re-export commonly used types
pub use config::{
    AdmissionConfig, AppConfig, BrowserConfig, ExtractionConfig, NavigationConfig,
    ScoringWeights,
};
pub use error::{ConfigError, ConfigResult, Result, WatcherError};
pub use types::{
    ListingRecord, PageSnapshot, ScanMode, ScanPayload, ScanRequest, ScanResult, ScanStatus,
    SignalBundle, Technology, DAYS_ON_MARKET_FALLBACK, MAX_LISTINGS, SQFT_FALLBACK,
};
