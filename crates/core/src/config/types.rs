use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::dispatch::Endpoint;
use crate::torrent::Destination;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub proxy: ProxySettings,
    #[serde(default)]
    pub destinations: DestinationsConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./nyaa.db")
}

/// Listing fetch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrapeConfig {
    /// Listing page to ingest (default: "https://nyaa.si/")
    #[serde(default = "default_scrape_url")]
    pub url: String,
    /// Attempts per fetch, the first one included (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * backoff_secs` (default: 1)
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    /// Per-request timeout (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            url: default_scrape_url(),
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ScrapeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs as u64)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

fn default_scrape_url() -> String {
    "https://nyaa.si/".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    1
}

fn default_timeout() -> u32 {
    30
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProxySettings {
    /// `socks5://`, `socks5h://`, `http://` or `https://` proxy URL.
    /// Empty or absent means direct connections.
    #[serde(default)]
    pub url: Option<String>,
}

/// Download daemon endpoints
///
/// Endpoints may carry credentials before the scheme:
/// `user:pass@http://host:9091/transmission/rpc` or
/// `token@http://host:6800/jsonrpc`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DestinationsConfig {
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default)]
    pub aria2: Option<String>,
    /// Per-request timeout for RPC calls (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Route RPC calls through `[proxy]` too (default: false)
    #[serde(default)]
    pub use_proxy: bool,
}

impl Default for DestinationsConfig {
    fn default() -> Self {
        Self {
            transmission: None,
            aria2: None,
            timeout_secs: default_timeout(),
            use_proxy: false,
        }
    }
}

impl DestinationsConfig {
    /// The raw endpoint for `destination`, if one is set and non-empty.
    pub fn endpoint(&self, destination: Destination) -> Option<&str> {
        let raw = match destination {
            Destination::Transmission => self.transmission.as_deref(),
            Destination::Aria2 => self.aria2.as_deref(),
        };
        raw.map(str::trim).filter(|s| !s.is_empty())
    }

    /// Destinations that have an endpoint configured.
    pub fn enabled(&self) -> Vec<Destination> {
        Destination::ALL
            .into_iter()
            .filter(|d| self.endpoint(*d).is_some())
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs as u64)
    }
}

/// Sanitized config for logging (credentials redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub database: DatabaseConfig,
    pub scrape: ScrapeConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    pub destinations: SanitizedDestinationsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDestinationsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<SanitizedEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria2: Option<SanitizedEndpoint>,
    pub timeout_secs: u32,
    pub use_proxy: bool,
}

/// Endpoint with its credentials hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEndpoint {
    pub url: String,
    pub credentials_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let endpoint = |destination: Destination| {
            config
                .destinations
                .endpoint(destination)
                .map(|raw| match Endpoint::parse(destination, raw) {
                    Ok(endpoint) => SanitizedEndpoint {
                        url: endpoint.url().to_string(),
                        credentials_configured: endpoint.has_credentials(),
                    },
                    Err(_) => SanitizedEndpoint {
                        url: "<invalid>".to_string(),
                        credentials_configured: false,
                    },
                })
        };

        Self {
            database: config.database.clone(),
            scrape: config.scrape.clone(),
            proxy: config
                .proxy
                .url
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(redact_url_userinfo),
            destinations: SanitizedDestinationsConfig {
                transmission: endpoint(Destination::Transmission),
                aria2: endpoint(Destination::Aria2),
                timeout_secs: config.destinations.timeout_secs,
                use_proxy: config.destinations.use_proxy,
            },
        }
    }
}

/// Replace any `user:pass@` part of a URL with `***@`.
fn redact_url_userinfo(raw: &str) -> String {
    match url::Url::parse(raw.trim()) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_password(None);
            let _ = parsed.set_username("***");
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<invalid>".to_string(),
    }
}
