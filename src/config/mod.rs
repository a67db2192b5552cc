//! Configuration module for the content backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::models::ContentKind;

/// Names of the environment variables read at startup.
pub mod vars {
    pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
    pub const GITHUB_OWNER: &str = "GITHUB_OWNER";
    pub const GITHUB_REPO: &str = "GITHUB_REPO";
    pub const GITHUB_BRANCH: &str = "GITHUB_BRANCH";
    pub const GITHUB_API_URL: &str = "GITHUB_API_URL";
    pub const ADMIN_PASSWORD: &str = "CONTENT_ADMIN_PASSWORD";
    pub const RESOURCES_PATH: &str = "CONTENT_RESOURCES_PATH";
    pub const EVENTS_PATH: &str = "CONTENT_EVENTS_PATH";
    pub const SITE_ORIGIN: &str = "CONTENT_SITE_ORIGIN";
    pub const MIRROR_URL: &str = "CONTENT_MIRROR_URL";
    pub const STORE: &str = "CONTENT_STORE";
    pub const UPSTREAM_TIMEOUT_SECS: &str = "CONTENT_UPSTREAM_TIMEOUT_SECS";
    pub const CALENDAR_TZ: &str = "CONTENT_CALENDAR_TZ";
    pub const BIND_ADDR: &str = "CONTENT_BIND_ADDR";
    pub const LOG_LEVEL: &str = "CONTENT_LOG_LEVEL";
}

/// Where saved documents go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// GitHub contents API
    GitHub,
    /// In-process store, for local development
    Memory,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token for the GitHub contents API (required for saving)
    pub github_token: Option<String>,
    /// Base URL of the GitHub REST API
    pub github_api_url: String,
    pub github_owner: String,
    pub github_repo: String,
    pub github_branch: String,
    /// Shared secret editors must present to save
    pub admin_password: Option<String>,
    /// Repository path of the resources document
    pub resources_path: String,
    /// Repository path of the events document
    pub events_path: String,
    /// Origin serving the deployed static copy (primary fetch source)
    pub site_origin: Option<String>,
    /// Raw-file mirror of the repository (fallback fetch source)
    pub mirror_url: String,
    pub store: StoreKind,
    /// Time budget for each upstream call
    pub upstream_timeout: Duration,
    /// Timezone named in calendar links
    pub calendar_timezone: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// A configuration value that could not be used.
#[derive(Debug, thiserror::Error)]
#[error("invalid {name}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub reason: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let github_owner = or(vars::GITHUB_OWNER, "JaneAdora");
        let github_repo = or(vars::GITHUB_REPO, "ebrtq");
        let github_branch = or(vars::GITHUB_BRANCH, "main");

        let mirror_url = var(vars::MIRROR_URL).unwrap_or_else(|| {
            format!(
                "https://raw.githubusercontent.com/{}/{}/{}",
                github_owner, github_repo, github_branch
            )
        });

        let store = match or(vars::STORE, "github").to_ascii_lowercase().as_str() {
            "github" => StoreKind::GitHub,
            "memory" => StoreKind::Memory,
            other => {
                return Err(ConfigError {
                    name: vars::STORE,
                    reason: format!("expected 'github' or 'memory', got '{}'", other),
                })
            }
        };

        let timeout_secs: u64 = or(vars::UPSTREAM_TIMEOUT_SECS, "10")
            .parse()
            .map_err(|e| ConfigError {
                name: vars::UPSTREAM_TIMEOUT_SECS,
                reason: format!("{}", e),
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError {
                name: vars::UPSTREAM_TIMEOUT_SECS,
                reason: "must be at least 1 second".to_string(),
            });
        }

        let bind_addr = or(vars::BIND_ADDR, "127.0.0.1:8080")
            .parse()
            .map_err(|e| ConfigError {
                name: vars::BIND_ADDR,
                reason: format!("{}", e),
            })?;

        Ok(Self {
            github_token: var(vars::GITHUB_TOKEN),
            github_api_url: or(vars::GITHUB_API_URL, "https://api.github.com"),
            github_owner,
            github_repo,
            github_branch,
            admin_password: var(vars::ADMIN_PASSWORD),
            resources_path: or(vars::RESOURCES_PATH, "src/data/resources.json"),
            events_path: or(vars::EVENTS_PATH, "src/data/events.json"),
            site_origin: var(vars::SITE_ORIGIN),
            mirror_url,
            store,
            upstream_timeout: Duration::from_secs(timeout_secs),
            calendar_timezone: or(vars::CALENDAR_TZ, "America/Chicago"),
            bind_addr,
            log_level: or(vars::LOG_LEVEL, "info"),
        })
    }

    /// Repository path of the document for `kind`.
    pub fn document_path(&self, kind: ContentKind) -> &str {
        match kind {
            ContentKind::Resources => &self.resources_path,
            ContentKind::Events => &self.events_path,
        }
    }
}
