//! Outbound proxy selection.

use reqwest::{ClientBuilder, Proxy};
use url::Url;

use crate::config::ConfigError;

/// How outbound requests reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxyConfig {
    /// Dial directly. Environment proxy variables are ignored.
    #[default]
    Direct,
    /// HTTP forward proxy (CONNECT for https targets).
    Http(Url),
    /// SOCKS5 tunnel. `socks5h` resolves names on the proxy.
    Socks5(Url),
}

impl ProxyConfig {
    /// Parse an optional proxy URL. Absent or blank means [`ProxyConfig::Direct`].
    pub fn parse(raw: Option<&str>) -> Result<Self, ConfigError> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(ProxyConfig::Direct),
            Some(raw) => raw,
        };

        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidProxy(format!("{}: {}", raw, e)))?;

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidProxy(format!("{}: missing host", raw)));
        }

        match url.scheme() {
            "socks5" | "socks5h" => Ok(ProxyConfig::Socks5(url)),
            "http" | "https" => Ok(ProxyConfig::Http(url)),
            other => Err(ConfigError::InvalidProxy(format!(
                "{}: unsupported scheme {}",
                raw, other
            ))),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyConfig::Direct => "direct",
            ProxyConfig::Http(_) => "http",
            ProxyConfig::Socks5(_) => "socks5",
        }
    }

    /// Route every request of `builder` according to this config.
    pub(crate) fn apply(&self, builder: ClientBuilder) -> Result<ClientBuilder, reqwest::Error> {
        Ok(match self {
            ProxyConfig::Direct => builder.no_proxy(),
            ProxyConfig::Http(url) | ProxyConfig::Socks5(url) => {
                builder.proxy(Proxy::all(url.as_str())?)
            }
        })
    }
}
