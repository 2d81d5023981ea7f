//! Magnet delivery to download daemons.
//!
//! Each destination is a [`MagnetSink`]. The [`DispatchService`] runs one
//! sequential pass per sink and writes confirmed deliveries back to storage.

mod aria2;
mod endpoint;
mod service;
mod transmission;
mod types;

pub use aria2::Aria2Sink;
pub use endpoint::{Endpoint, EndpointAuth};
pub use service::DispatchService;
pub use transmission::TransmissionSink;
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ConfigError;
use crate::fetcher::ProxyConfig;
use crate::torrent::Destination;

/// A destination that accepts magnet links one at a time.
#[async_trait]
pub trait MagnetSink: Send + Sync {
    /// Which delivery flag this sink owns.
    fn destination(&self) -> Destination;

    /// Hand one magnet to the daemon. `Ok` means the daemon confirmed it.
    async fn add_magnet(&self, magnet: &str) -> Result<(), DispatchSendError>;
}

/// Build the sink for `destination` from its raw endpoint string.
pub fn create_sink(
    destination: Destination,
    raw_endpoint: &str,
    timeout: Duration,
    proxy: &ProxyConfig,
) -> Result<Box<dyn MagnetSink>, ConfigError> {
    let endpoint = Endpoint::parse(destination, raw_endpoint)?;
    let invalid = |e: reqwest::Error| ConfigError::InvalidDestination {
        destination: destination.to_string(),
        reason: e.to_string(),
    };

    Ok(match destination {
        Destination::Transmission => Box::new(
            TransmissionSink::with_proxy(endpoint, timeout, proxy).map_err(invalid)?,
        ),
        Destination::Aria2 => {
            Box::new(Aria2Sink::with_proxy(endpoint, timeout, proxy).map_err(invalid)?)
        }
    })
}
