use std::env;
use std::str::FromStr;
use std::time::Duration;

use sitepress_core::assets::{DEFAULT_MAX_ASSET_BYTES, DEFAULT_UPLOAD_DIR};
use sitepress_core::AssetPolicy;
use sitepress_publish::pipeline::{DEFAULT_BRANCH, DEFAULT_CONTENT_PATH};
use sitepress_publish::store::github::DEFAULT_API_URL;
use sitepress_publish::{GitHubConfig, PublisherConfig};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Where publishes go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    GitHub,
    /// Process-local store; nothing leaves the machine.
    Memory,
}

impl FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Backend::GitHub),
            "memory" => Ok(Backend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub chat_id: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub backend: Backend,
    /// Present when `backend` is `GitHub`.
    pub github: Option<GitHubConfig>,
    pub publisher: PublisherConfig,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
    /// Booking relay; disabled when unset.
    pub telegram: Option<TelegramConfig>,
    pub event_bus_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let text = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let request_timeout = Duration::from_secs(parsed(&get, "REQUEST_TIMEOUT_SECS", 20u64)?);

        let backend_raw = text("PUBLISH_BACKEND", "github");
        let backend: Backend = backend_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "PUBLISH_BACKEND",
            value: backend_raw.clone(),
        })?;

        let github = match backend {
            Backend::GitHub => Some(GitHubConfig {
                api_url: text("GITHUB_API_URL", DEFAULT_API_URL),
                owner: get("GITHUB_OWNER").ok_or(ConfigError::Missing("GITHUB_OWNER"))?,
                repo: get("GITHUB_REPO").ok_or(ConfigError::Missing("GITHUB_REPO"))?,
                token: get("GITHUB_TOKEN").ok_or(ConfigError::Missing("GITHUB_TOKEN"))?,
                timeout: request_timeout,
            }),
            Backend::Memory => None,
        };

        let publisher = PublisherConfig {
            branch: text("GITHUB_BRANCH", DEFAULT_BRANCH),
            content_path: text("CONTENT_PATH", DEFAULT_CONTENT_PATH),
            assets: AssetPolicy {
                upload_dir: text("UPLOAD_DIR", DEFAULT_UPLOAD_DIR),
                max_bytes: parsed(&get, "MAX_ASSET_BYTES", DEFAULT_MAX_ASSET_BYTES)?,
            },
            conflict_retries: parsed(&get, "PUBLISH_CONFLICT_RETRIES", 2u32)?,
            concurrency: parsed(&get, "PUBLISH_CONCURRENCY", 4usize)?,
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                api_url: text("TELEGRAM_API_URL", "https://api.telegram.org"),
                bot_token,
                chat_id,
            }),
            _ => None,
        };

        Ok(Self {
            host: text("HOST", "0.0.0.0"),
            port: parsed(&get, "PORT", 3030u16)?,
            log_level: text("LOG_LEVEL", "info"),
            backend,
            github,
            publisher,
            request_timeout,
            body_limit_bytes: parsed(&get, "BODY_LIMIT_BYTES", 64 * 1024 * 1024usize)?,
            telegram,
            event_bus_capacity: parsed(&get, "EVENT_BUS_CAPACITY", 1024usize)?,
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}
