use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(figment(Some(path)))
}

/// Load configuration from defaults and environment variables only
pub fn load_default_config() -> Result<Config, ConfigError> {
    extract(figment(None))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Defaults < TOML file < `CRAWLER_*` variables < `PROXY_URL`.
fn figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::prefixed("CRAWLER_").split("__"))
        .merge(
            Env::raw()
                .only(&["PROXY_URL"])
                .map(|_| "proxy.url".into()),
        )
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    figment
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}
