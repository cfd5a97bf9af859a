//! Configuration management for roster.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Alphabet;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/roster/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory endpoints and search parameters
    pub directory: DirectoryConfig,
    /// DOM hooks used to read the directory pages
    pub selectors: SelectorConfig,
    /// Login portal settings
    pub auth: AuthConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Page readiness polling settings
    pub wait: WaitConfig,
    /// Enumeration behavior settings
    pub crawl: CrawlConfig,
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

    /// Load configuration from an explicit path, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `ROSTER_HEADLESS`: Override browser headless mode (true/false)
    /// - `ROSTER_TITLE_FILTER`: Override the title filter (empty disables it)
    /// - `ROSTER_MAX_WAIT_MS`: Override the readiness bound
    /// - `ROSTER_WORKERS`: Override the number of parallel browsing contexts
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `ROSTER_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ROSTER_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("ROSTER_TITLE_FILTER") {
            tracing::debug!("Override directory.title_filter from env: {:?}", val);
            self.directory.title_filter = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var("ROSTER_MAX_WAIT_MS") {
            if let Ok(ms) = val.parse() {
                self.wait.max_wait_ms = ms;
                tracing::debug!("Override wait.max_wait_ms from env: {}", ms);
            }
        }

        if let Ok(val) = std::env::var("ROSTER_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.crawl.workers = workers;
                tracing::debug!("Override crawl.workers from env: {}", workers);
            }
        }
    }

    /// Reject values the crawler cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        fn invalid(field: &str, reason: &str) -> ConfigError {
            ConfigError::InvalidValue {
                field: field.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.directory.cap == 0 {
            return Err(invalid("directory.cap", "must be at least 1"));
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(invalid("wait.poll_interval_ms", "must be at least 1"));
        }
        if self.wait.poll_interval_ms > self.wait.max_wait_ms {
            return Err(invalid(
                "wait.poll_interval_ms",
                "must not exceed wait.max_wait_ms",
            ));
        }
        if self.crawl.workers == 0 {
            return Err(invalid("crawl.workers", "must be at least 1"));
        }
        if self.crawl.max_retries == 0 {
            return Err(invalid("crawl.max_retries", "must be at least 1"));
        }
        if url::Url::parse(&self.directory.base_url).is_err() {
            return Err(invalid("directory.base_url", "not an absolute URL"));
        }
        if url::Url::parse(&self.auth.login_url).is_err() {
            return Err(invalid("auth.login_url", "not an absolute URL"));
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/roster/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("org", "roster", "roster").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Directory endpoints and search parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Directory home; the search and term endpoints share this URL
    pub base_url: String,
    /// Optional `title` filter applied to every field query
    pub title_filter: Option<String>,
    /// Maximum number of results the directory displays for one query
    pub cap: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://directory.yale.edu/".to_string(),
            title_filter: Some("Professor".to_string()),
            cap: 25,
        }
    }
}

/// DOM hooks the parser reads. Ids are written as CSS selectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Loading indicator shown while results render
    pub loading_indicator: String,
    /// Inline style token marking the loading indicator as busy
    pub busy_token: String,
    /// Header holding the literal match count
    pub results_header: String,
    /// Results region; its visibility disambiguates zero and one match
    pub result_region: String,
    /// Surplus-results banner inside the results region
    pub surplus_warning: String,
    /// One listing entry
    pub result_item: String,
    /// Name element (usually a link) inside a listing entry
    pub result_name: String,
    /// Control on the detail view that returns to the listing
    pub go_back: String,
    /// Login/logout control on the directory header
    pub login_control: String,
    /// Detail view fields
    pub detail: DetailSelectors,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            loading_indicator: "#loading-indicator".to_string(),
            busy_token: "inline".to_string(),
            results_header: "#results-people-header".to_string(),
            result_region: "#bps-result-region".to_string(),
            surplus_warning: "div.directory_results_warning".to_string(),
            result_item: "article.directory_item".to_string(),
            result_name: ".bps-result-name".to_string(),
            go_back: ".go-back".to_string(),
            login_control: "#bps-login".to_string(),
            detail: DetailSelectors::default(),
        }
    }
}

/// Selectors of the ten fields on a detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSelectors {
    /// Container of the resolved entry
    pub article: String,
    /// Display name
    pub name: String,
    /// Internal identifier
    pub internal_id: String,
    /// Job title
    pub title: String,
    /// Email anchor
    pub email: String,
    /// Principal identifier
    pub user_principal_id: String,
    /// Organizational unit
    pub unit: String,
    /// Department
    pub department: String,
    /// Office address
    pub office_location: String,
    /// Building
    pub building_name: String,
    /// Mailing address
    pub mailing_address: String,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            article: "article#bpa-final-result-article".to_string(),
            name: "#bps-final-name".to_string(),
            internal_id: "#bps-final-netid".to_string(),
            title: "#bps-final-title".to_string(),
            email: "#bps-final-email-anchor".to_string(),
            user_principal_id: "#bps-final-upi".to_string(),
            unit: "#bps-final-org".to_string(),
            department: "#bps-final-org-unit".to_string(),
            office_location: "#bps-final-office-addr".to_string(),
            building_name: "#bps-final-location".to_string(),
            mailing_address: "#bps-final-mailing-addr".to_string(),
        }
    }
}

/// Login portal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Login portal URL (separate host from the directory)
    pub login_url: String,
    /// How long to wait for the operator to finish logging in
    pub approval_timeout_secs: u64,
    /// How long to poll for the login control to flip to the logout label
    pub marker_timeout_ms: u64,
    /// Label of the login control once authenticated (case-insensitive)
    pub logout_label: String,
    /// Label of the login control while logged out (case-insensitive)
    pub login_label: String,
}

impl AuthConfig {
    /// Operator approval bound.
    #[must_use]
    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs)
    }

    /// Post-login marker bound.
    #[must_use]
    pub fn marker_timeout(&self) -> Duration {
        Duration::from_millis(self.marker_timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_url: "https://secure6.its.yale.edu/cas/login".to_string(),
            approval_timeout_secs: 300,
            marker_timeout_ms: 3000,
            logout_label: "log out".to_string(),
            login_label: "log in".to_string(),
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode (login needs a visible window)
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Minimum delay between two navigations of one browsing context
    pub min_delay_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1366,
            window_height: 768,
            navigation_timeout_secs: 30,
            min_delay_ms: 250,
        }
    }
}

/// Page readiness polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Upper bound on one readiness wait
    pub max_wait_ms: u64,
    /// Delay between two readiness checks
    pub poll_interval_ms: u64,
}

impl WaitConfig {
    /// Readiness bound as a `Duration`.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Poll interval as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: 3000,
            poll_interval_ms: 100,
        }
    }
}

/// Enumeration behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Characters appended when a prefix is subdivided, in traversal order
    pub alphabet: Alphabet,
    /// Deepest prefix the walk subdivides; capped prefixes at this depth are
    /// extracted as truncated leaves
    pub max_depth: usize,
    /// Parallel browsing contexts, each with its own session
    pub workers: usize,
    /// Resolve every entry's detail view (requires authentication)
    pub resolve_details: bool,
    /// Navigation attempts per query before the walk aborts
    pub max_retries: u32,
    /// Base delay between navigation attempts
    pub retry_delay_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::default(),
            max_depth: 12,
            workers: 1,
            resolve_details: true,
            max_retries: 3,
            retry_delay_ms: 2000,
        }
    }
}
