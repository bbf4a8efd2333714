//! Configuration management for the Watcher engine.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::MAX_LISTINGS;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main engine configuration.
///
/// This is loaded from `~/.config/watcher/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser launch and stealth settings
    pub browser: BrowserConfig,
    /// Admission gate sizing
    pub admission: AdmissionConfig,
    /// Navigation timeouts and settle delays
    pub navigation: NavigationConfig,
    /// Extraction limits and templates
    pub extraction: ExtractionConfig,
    /// Lead score weights
    pub scoring: ScoringWeights,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `WATCHER_HEADLESS`: Override browser headless mode (true/false)
    /// - `WATCHER_CHROME_EXECUTABLE`: Path to the Chromium binary
    /// - `WATCHER_MAX_CONCURRENT_SCANS`: Explicit admission gate capacity
    /// - `WATCHER_HOST_MEMORY_MB`: Host memory budget used to size the gate
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Unparseable values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("WATCHER_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("WATCHER_CHROME_EXECUTABLE") {
            if !val.trim().is_empty() {
                tracing::debug!("Override browser.chrome_executable from env: {}", val);
                self.browser.chrome_executable = Some(PathBuf::from(val));
            }
        }

        if let Some(val) = lookup("WATCHER_MAX_CONCURRENT_SCANS") {
            if let Ok(max) = val.parse() {
                self.admission.max_concurrent_scans = Some(max);
                tracing::debug!("Override admission.max_concurrent_scans from env: {}", max);
            }
        }

        if let Some(val) = lookup("WATCHER_HOST_MEMORY_MB") {
            if let Ok(mb) = val.parse() {
                self.admission.host_memory_mb = mb;
                tracing::debug!("Override admission.host_memory_mb from env: {}", mb);
            }
        }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.admission.max_sessions == 0 {
            return Err(invalid("admission.max_sessions", "must be at least 1"));
        }
        if self.admission.session_memory_mb == 0 {
            return Err(invalid("admission.session_memory_mb", "must be non-zero"));
        }
        if self.admission.max_concurrent_scans == Some(0) {
            return Err(invalid("admission.max_concurrent_scans", "must be at least 1"));
        }
        if self.navigation.zip_timeout_secs == 0 || self.navigation.url_timeout_secs == 0 {
            return Err(invalid("navigation", "timeouts must be non-zero"));
        }
        if !self.extraction.listing_search_template.contains("{zip}") {
            return Err(invalid(
                "extraction.listing_search_template",
                "missing {zip} placeholder",
            ));
        }
        if !(1..=MAX_LISTINGS).contains(&self.extraction.max_listings) {
            return Err(invalid(
                "extraction.max_listings",
                &format!("must be between 1 and {MAX_LISTINGS}"),
            ));
        }
        if self.extraction.email_cap == 0 {
            return Err(invalid("extraction.email_cap", "must be at least 1"));
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| invalid("config_path", "no parent directory"))?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/watcher/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "watcher", "watcher").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Browser launch and stealth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Explicit Chromium binary; auto-detected when unset
    pub chrome_executable: Option<PathBuf>,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// User agent override; the stealth default is used when unset
    pub user_agent: Option<String>,
    /// Pick user agent and viewport from a pool per scan
    pub randomize_fingerprint: bool,
    /// Sub-resource types aborted during page load
    pub blocked_resource_types: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
            randomize_fingerprint: false,
            blocked_resource_types: ["image", "media", "font", "stylesheet"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Admission gate sizing.
///
/// Every concurrent scan holds a full Chromium process, so the gate is sized
/// from the host memory budget unless an explicit capacity is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Explicit capacity; overrides the memory-derived value
    pub max_concurrent_scans: Option<usize>,
    /// Memory available to browser sessions, in MB
    pub host_memory_mb: u64,
    /// Approximate memory held by one browser session, in MB
    pub session_memory_mb: u64,
    /// Upper bound on the derived capacity
    pub max_sessions: usize,
}

impl AdmissionConfig {
    /// Number of permits the admission gate should hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        let derived = self.max_concurrent_scans.unwrap_or_else(|| {
            let per_session = self.session_memory_mb.max(1);
            usize::try_from(self.host_memory_mb / per_session).unwrap_or(usize::MAX)
        });
        derived.clamp(1, self.max_sessions.max(1))
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scans: None,
            host_memory_mb: 512,
            session_memory_mb: 200,
            max_sessions: 3,
        }
    }
}

/// Navigation timeouts and post-navigation settle delays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Navigation budget for listing searches, in seconds
    pub zip_timeout_secs: u64,
    /// Navigation budget for website analysis, in seconds
    pub url_timeout_secs: u64,
    /// Fixed delay after a listing search loads, in milliseconds
    pub zip_settle_ms: u64,
    /// Fixed delay after a website loads, in milliseconds
    pub url_settle_ms: u64,
    /// How long to wait for the first listing card, in seconds
    pub listing_ready_timeout_secs: u64,
    /// Quiet period that counts as network idle, in milliseconds
    pub network_idle_ms: u64,
}

impl NavigationConfig {
    #[must_use]
    pub fn zip_timeout(&self) -> Duration {
        Duration::from_secs(self.zip_timeout_secs)
    }

    #[must_use]
    pub fn url_timeout(&self) -> Duration {
        Duration::from_secs(self.url_timeout_secs)
    }

    #[must_use]
    pub fn zip_settle(&self) -> Duration {
        Duration::from_millis(self.zip_settle_ms)
    }

    #[must_use]
    pub fn url_settle(&self) -> Duration {
        Duration::from_millis(self.url_settle_ms)
    }

    #[must_use]
    pub fn listing_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_ready_timeout_secs)
    }

    #[must_use]
    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            zip_timeout_secs: 60,
            url_timeout_secs: 30,
            zip_settle_ms: 3000,
            url_settle_ms: 2000,
            listing_ready_timeout_secs: 20,
            network_idle_ms: 1000,
        }
    }
}

/// Extraction limits and templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Listing search URL; `{zip}` is replaced by the postal code
    pub listing_search_template: String,
    /// Maximum listing cards read per search
    pub max_listings: usize,
    /// Maximum contact emails kept per site
    pub email_cap: usize,
    /// Years before the reference year that still count as current
    pub recent_year_window: i32,
    /// Year used for staleness checks; the current UTC year when unset
    pub reference_year: Option<i32>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            listing_search_template: "https://www.realtor.com/realestateandhomes-search/{zip}"
                .to_string(),
            max_listings: MAX_LISTINGS,
            email_cap: 3,
            recent_year_window: 2,
            reference_year: None,
        }
    }
}

/// Lead score weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Points per distinct detected technology
    pub technology: u32,
    /// Points when the site is hiring
    pub hiring: u32,
    /// Points per matched growth keyword
    pub growth_signal: u32,
    /// Points per social profile found
    pub social_profile: u32,
    /// Points when at least one contact email was found
    pub contact: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            technology: 15,
            hiring: 30,
            growth_signal: 10,
            social_profile: 5,
            contact: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.browser.headless);
        assert_eq!(config.browser.blocked_resource_types.len(), 4);
        assert_eq!(config.navigation.zip_timeout_secs, 60);
        assert_eq!(config.extraction.max_listings, 10);
        assert_eq!(config.scoring.hiring, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[admission]"));
        assert!(toml_str.contains("[scoring]"));

        let parsed = AppConfig::from_toml_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.scoring, config.scoring);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.admission.max_concurrent_scans = Some(2);
        config.scoring.technology = 20;

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded_contents = fs::read_to_string(&config_path).expect("read config file");
        let loaded = AppConfig::from_toml_str(&loaded_contents).expect("parse loaded config");

        assert_eq!(loaded.admission.max_concurrent_scans, Some(2));
        assert_eq!(loaded.scoring.technology, 20);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded = AppConfig::load_from(&tmp.path().join("absent.toml")).expect("defaults");
        assert!(loaded.browser.headless);
        assert_eq!(loaded.extraction.max_listings, MAX_LISTINGS);

        let path = tmp.path().join("config.toml");
        fs::write(&path, "[extraction]\nmax_listings = 4\n").expect("write config file");
        let loaded = AppConfig::load_from(&path).expect("load config");
        assert_eq!(loaded.extraction.max_listings, 4);

        fs::write(&path, "[extraction]\nmax_listings = 40\n").expect("write config file");
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WATCHER_HEADLESS", "false"),
            ("WATCHER_MAX_CONCURRENT_SCANS", "2"),
            ("WATCHER_HOST_MEMORY_MB", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| vars.get(key).map(|v| (*v).to_string()));

        assert!(!config.browser.headless);
        assert_eq!(config.admission.max_concurrent_scans, Some(2));
        // Unparseable values leave the default in place
        assert_eq!(config.admission.host_memory_mb, 512);
        assert!(config.browser.chrome_executable.is_none());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[admission]
host_memory_mb = 1024

[scoring]
technology = 20
"#;

        let config = AppConfig::from_toml_str(toml_str).expect("parse partial config");
        assert_eq!(config.admission.host_memory_mb, 1024);
        assert_eq!(config.scoring.technology, 20);
        // These should be defaults
        assert_eq!(config.scoring.hiring, 30);
        assert_eq!(config.navigation.url_timeout_secs, 30);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_admission_capacity_from_memory() {
        let mut admission = AdmissionConfig::default();
        assert_eq!(admission.capacity(), 2);

        admission.host_memory_mb = 150;
        assert_eq!(admission.capacity(), 1);

        admission.host_memory_mb = 8192;
        assert_eq!(admission.capacity(), 3);

        admission.max_concurrent_scans = Some(1);
        assert_eq!(admission.capacity(), 1);
    }

    #[test]
    fn test_invalid_template_rejected() {
        let toml_str = r#"
[extraction]
listing_search_template = "https://listings.test/search"
"#;
        let err = AppConfig::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_listing_limit_cannot_be_raised() {
        let err = AppConfig::from_toml_str("[extraction]\nmax_listings = 50").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "extraction.max_listings"
        ));
        assert!(AppConfig::from_toml_str("[extraction]\nmax_listings = 0").is_err());

        let config = AppConfig::from_toml_str("[extraction]\nmax_listings = 4").unwrap();
        assert_eq!(config.extraction.max_listings, 4);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let toml_str = r#"
[admission]
max_concurrent_scans = 0
"#;
        assert!(AppConfig::from_toml_str(toml_str).is_err());
    }
}
