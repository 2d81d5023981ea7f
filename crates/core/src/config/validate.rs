use super::{types::Config, ConfigError};
use crate::dispatch::Endpoint;
use crate::fetcher::ProxyConfig;

/// Validate configuration
/// Currently validates:
/// - Scrape URL is an absolute http(s) URL
/// - Attempt count and timeouts are not 0
/// - Proxy URL parses (fails with `InvalidProxy`)
/// - Every configured destination endpoint parses (fails with `InvalidDestination`)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Scrape validation
    match url::Url::parse(&config.scrape.url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => {
            return Err(ConfigError::ValidationError(format!(
                "scrape.url must be http or https, got {}",
                parsed.scheme()
            )));
        }
        Err(e) => {
            return Err(ConfigError::ValidationError(format!(
                "scrape.url is not a valid URL: {}",
                e
            )));
        }
    }

    if config.scrape.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "scrape.max_attempts cannot be 0".to_string(),
        ));
    }

    if config.scrape.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scrape.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.destinations.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "destinations.timeout_secs cannot be 0".to_string(),
        ));
    }

    ProxyConfig::parse(config.proxy.url.as_deref())?;

    for destination in config.destinations.enabled() {
        if let Some(raw) = config.destinations.endpoint(destination) {
            Endpoint::parse(destination, raw)?;
        }
    }

    Ok(())
}
