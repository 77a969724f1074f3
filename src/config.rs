//! Configuration types for workshop-deps

use crate::error::{Error, Result};
use crate::types::AppId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// HTTP endpoints and client settings used by the web collaborators
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Community site hosting item detail pages (default: "https://steamcommunity.com")
    #[serde(default = "default_community_base")]
    pub community_base: String,

    /// Web API base URL (default: "https://api.steampowered.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            community_base: default_community_base(),
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Retry configuration for transient collaborator failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Download progress polling settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval between progress polls, in milliseconds (default: 100)
    #[serde(default = "default_poll_interval", with = "millis_serde")]
    pub poll_interval: Duration,

    /// Give up after this long (None = wait until complete or cancelled)
    #[serde(default, with = "optional_duration_serde")]
    pub max_duration: Option<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_duration: None,
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Application context resolution starts in (default: placeholder app 480)
    #[serde(default = "default_context")]
    pub context: AppId,

    /// HTTP collaborator settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry behaviour of the HTTP collaborators
    #[serde(default)]
    pub retry: RetryConfig,

    /// Progress monitoring
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context: default_context(),
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl Config {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Check values serde cannot reject on its own
    pub fn validate(&self) -> Result<()> {
        if self.monitor.poll_interval.is_zero() {
            return Err(Error::config(
                "monitor.poll_interval",
                "poll interval must be greater than zero",
            ));
        }

        let multiplier = self.retry.backoff_multiplier;
        if !(multiplier > 0.0 && multiplier <= MAX_BACKOFF_MULTIPLIER) {
            return Err(Error::config(
                "retry.backoff_multiplier",
                format!(
                    "backoff multiplier must be in (0, {MAX_BACKOFF_MULTIPLIER}], got {multiplier}"
                ),
            ));
        }

        for (key, base) in [
            ("http.community_base", &self.http.community_base),
            ("http.api_base", &self.http.api_base),
        ] {
            base_url(key, base)?;
        }

        Ok(())
    }
}

/// Parse a configured http(s) base URL so relative paths join beneath it
///
/// A base without a trailing slash (`http://host/mirror`) gets one, otherwise
/// `Url::join` would replace its last segment.
pub(crate) fn base_url(key: &str, raw: &str) -> Result<url::Url> {
    let mut url =
        url::Url::parse(raw).map_err(|e| Error::config(key, format!("invalid URL {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::config(
            key,
            format!("unsupported URL scheme {:?}", url.scheme()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

const MAX_BACKOFF_MULTIPLIER: f64 = 100.0;

fn default_context() -> AppId {
    AppId::PLACEHOLDER
}

fn default_community_base() -> String {
    "https://steamcommunity.com".into()
}

fn default_api_base() -> String {
    "https://api.steampowered.com".into()
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
