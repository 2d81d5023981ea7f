//! Destination endpoint strings.
//!
//! Endpoints may carry a secret before the scheme, `user:pass@http://host/rpc`
//! or `token@http://host/rpc`. The secret is split off at the first `@` only
//! when that `@` comes before `://`; otherwise the whole string is the URL.

use url::Url;

use crate::config::ConfigError;
use crate::torrent::Destination;

/// Credentials attached to an endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum EndpointAuth {
    None,
    Basic { username: String, password: String },
    Token(String),
}

impl std::fmt::Debug for EndpointAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointAuth::None => f.write_str("None"),
            EndpointAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            EndpointAuth::Token(_) => f.write_str("Token(***)"),
        }
    }
}

/// A parsed destination endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    auth: EndpointAuth,
}

impl Endpoint {
    /// Parse `raw` the way `destination` expects its secret.
    pub fn parse(destination: Destination, raw: &str) -> Result<Self, ConfigError> {
        match destination {
            Destination::Transmission => Self::parse_credentials(raw),
            Destination::Aria2 => Self::parse_token(raw),
        }
    }

    /// `user:pass@URL` (basic auth) or a bare URL.
    pub fn parse_credentials(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidDestination {
            destination: Destination::Transmission.to_string(),
            reason,
        };

        let (secret, rest) = split_secret(raw.trim());
        let auth = match secret {
            None => EndpointAuth::None,
            Some(creds) => match creds.split_once(':') {
                Some((username, password)) => EndpointAuth::Basic {
                    username: username.to_string(),
                    password: password.to_string(),
                },
                None => {
                    return Err(invalid(
                        "credentials must be written as user:pass".to_string(),
                    ))
                }
            },
        };

        Ok(Self {
            url: parse_url(rest).map_err(invalid)?,
            auth,
        })
    }

    /// `token@URL` or a bare URL.
    pub fn parse_token(raw: &str) -> Result<Self, ConfigError> {
        let (secret, rest) = split_secret(raw.trim());
        let url = parse_url(rest).map_err(|reason| ConfigError::InvalidDestination {
            destination: Destination::Aria2.to_string(),
            reason,
        })?;

        Ok(Self {
            url,
            auth: secret
                .map(|token| EndpointAuth::Token(token.to_string()))
                .unwrap_or(EndpointAuth::None),
        })
    }

    /// Endpoint without any credentials.
    pub fn from_url(url: Url) -> Self {
        Self {
            url,
            auth: EndpointAuth::None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn auth(&self) -> &EndpointAuth {
        &self.auth
    }

    pub fn has_credentials(&self) -> bool {
        !matches!(self.auth, EndpointAuth::None)
    }

    /// Token for token-authenticated RPCs, empty if none was given.
    pub fn token(&self) -> &str {
        match &self.auth {
            EndpointAuth::Token(token) => token,
            _ => "",
        }
    }
}

fn split_secret(raw: &str) -> (Option<&str>, &str) {
    match (raw.find('@'), raw.find("://")) {
        (Some(at), Some(scheme)) if at < scheme => (Some(&raw[..at]), &raw[at + 1..]),
        _ => (None, raw),
    }
}

fn parse_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("{}: {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("{}: unsupported scheme {}", raw, other)),
    }
}
