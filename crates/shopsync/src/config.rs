//! Run configuration
//!
//! Loaded from YAML (camelCase keys), then overridden from the environment,
//! then validated. Nothing reads configuration from globals; the validated
//! [`RunConfig`] travels inside the scenario context.

use crate::result::{SyncError, SyncResult};
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::stabilize::{
    StabilizationConfig, StabilizationMode, DEFAULT_AJAX_TIMEOUT_MS, DEFAULT_OVERLAY_TIMEOUT_MS,
    DEFAULT_REPLACEMENT_TIMEOUT_MS,
};
use crate::wait::{WaitSpec, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Overrides the sign-in email
pub const ENV_EMAIL: &str = "SHOPSYNC_EMAIL";
/// Overrides the sign-in password
pub const ENV_PASSWORD: &str = "SHOPSYNC_PASSWORD";
/// Overrides the storefront URL
pub const ENV_BASE_URL: &str = "SHOPSYNC_BASE_URL";

/// Account used to sign in
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Per-step stabilization budgets in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StabilizationTimeouts {
    /// Loading overlay budget
    pub overlay_timeout: u64,
    /// Async-activity budget
    pub ajax_timeout: u64,
    /// Container replacement budget
    pub replacement_timeout: u64,
}

impl Default for StabilizationTimeouts {
    fn default() -> Self {
        Self {
            overlay_timeout: DEFAULT_OVERLAY_TIMEOUT_MS,
            ajax_timeout: DEFAULT_AJAX_TIMEOUT_MS,
            replacement_timeout: DEFAULT_REPLACEMENT_TIMEOUT_MS,
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserSettings {
    /// Run without a window
    pub headless: bool,
    /// Chromium executable; auto-detected when absent
    pub chromium_path: Option<String>,
    /// Viewport width
    pub window_width: u32,
    /// Viewport height
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

const fn default_timeout() -> u64 {
    DEFAULT_WAIT_TIMEOUT_MS
}

const fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

const fn default_retry_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Everything a run needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunConfig {
    /// Storefront root, `http://` or `https://`
    pub base_url: String,
    /// Wait timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub default_timeout: u64,
    /// Poll cadence in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Account for scenarios that sign in
    #[serde(default)]
    pub credentials: Option<Credentials>,
    /// Stabilization budgets
    #[serde(default)]
    pub stabilization: StabilizationTimeouts,
    /// Fail on the first stabilization step that times out
    #[serde(default)]
    pub strict_stabilization: bool,
    /// Attempts for stale-guarded operations
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserSettings,
}

impl RunConfig {
    /// Minimal configuration for `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_timeout: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval: DEFAULT_POLL_INTERVAL_MS,
            credentials: None,
            stabilization: StabilizationTimeouts::default(),
            strict_stabilization: false,
            retry_attempts: DEFAULT_MAX_ATTEMPTS,
            browser: BrowserSettings::default(),
        }
    }

    /// Set credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Parse YAML without validating
    pub fn from_yaml_str(yaml: &str) -> SyncResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a YAML file, apply environment overrides, validate
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `SHOPSYNC_*` overrides read through `lookup`
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        let email = lookup(ENV_EMAIL);
        let password = lookup(ENV_PASSWORD);
        if email.is_some() || password.is_some() {
            let current = self.credentials.take().unwrap_or_else(|| Credentials::new("", ""));
            self.credentials = Some(Credentials {
                email: email.unwrap_or(current.email),
                password: password.unwrap_or(current.password),
            });
        }
        self
    }

    /// Check the invariants
    ///
    /// # Errors
    ///
    /// `Config` naming the first violated rule.
    pub fn validate(&self) -> SyncResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SyncError::config(format!(
                "baseUrl must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.poll_interval == 0 {
            return Err(SyncError::config("pollInterval must be greater than 0"));
        }
        let _ = WaitSpec::from_millis(self.default_timeout, self.poll_interval)?;
        if let Some(creds) = &self.credentials {
            if creds.email.trim().is_empty() || creds.password.is_empty() {
                return Err(SyncError::config("credentials need both email and password"));
            }
        }
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(SyncError::config("browser window size must be non-zero"));
        }
        Ok(())
    }

    /// Poller settings
    #[must_use]
    pub fn wait_spec(&self) -> WaitSpec {
        WaitSpec::clamped(
            Duration::from_millis(self.default_timeout),
            Duration::from_millis(self.poll_interval),
        )
    }

    /// Stabilization settings
    #[must_use]
    pub fn stabilization_config(&self) -> StabilizationConfig {
        StabilizationConfig {
            overlay_timeout: Duration::from_millis(self.stabilization.overlay_timeout),
            ajax_timeout: Duration::from_millis(self.stabilization.ajax_timeout),
            replacement_timeout: Duration::from_millis(self.stabilization.replacement_timeout),
            poll_interval: Duration::from_millis(self.poll_interval),
            mode: if self.strict_stabilization {
                StabilizationMode::Strict
            } else {
                StabilizationMode::BestEffort
            },
        }
    }

    /// Stale-retry budget
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts)
    }

    /// Absolute URL for a storefront path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
