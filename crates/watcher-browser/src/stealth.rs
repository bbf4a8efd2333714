use rand::Rng;
use watcher_core::BrowserConfig;

/// Desktop Chrome user agent presented when nothing else is configured.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Chromium flags for containerized hosts plus automation-flag suppression.
///
/// `--no-sandbox` and `--disable-setuid-sandbox` turn off Chromium's OS-level
/// process isolation, `--disable-dev-shm-usage` stops it relying on a
/// shared-memory mount that small containers do not provide. These keep the
/// browser launchable on such hosts; they weaken isolation between the page
/// and the host, so only point the engine at hosts you would run it next to.
pub const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
];

/// Runs before any page script and hides the `navigator.webdriver` flag.
pub const WEBDRIVER_MASK_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// Fingerprint applied to every browsing context of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthProfile {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub timezone: String,
    /// Scripts installed to run on every new document.
    pub init_scripts: Vec<String>,
}

impl Default for StealthProfile {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            timezone: "America/New_York".to_string(),
            init_scripts: vec![WEBDRIVER_MASK_SCRIPT.to_string()],
        }
    }
}

impl StealthProfile {
    /// Build the profile described by the browser configuration.
    #[must_use]
    pub fn from_config(config: &BrowserConfig) -> Self {
        let mut profile = if config.randomize_fingerprint {
            Self::randomized()
        } else {
            Self {
                viewport_width: config.window_width,
                viewport_height: config.window_height,
                ..Self::default()
            }
        };

        if let Some(user_agent) = &config.user_agent {
            profile.user_agent.clone_from(user_agent);
        }
        profile
    }

    /// Generate a randomized fingerprint configuration
    #[must_use]
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        // Common desktop user agents
        let user_agents = [
            DEFAULT_USER_AGENT,
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        ];

        // Common viewport sizes
        let viewports = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

        let ua_idx = rng.gen_range(0..user_agents.len());
        let vp_idx = rng.gen_range(0..viewports.len());
        let (width, height) = viewports[vp_idx];

        Self {
            user_agent: user_agents[ua_idx].to_string(),
            viewport_width: width,
            viewport_height: height,
            ..Self::default()
        }
    }
}
