//! aria2 JSON-RPC sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use super::{DispatchSendError, Endpoint, MagnetSink};
use crate::fetcher::ProxyConfig;
use crate::torrent::Destination;

/// JSON-RPC request id sent with every call.
const RPC_ID: &str = "nyaa-crawler";

/// Sends magnets with `aria2.addUri`, authenticated by the `token:` param.
pub struct Aria2Sink {
    client: Client,
    endpoint: Endpoint,
}

impl Aria2Sink {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_proxy(endpoint, timeout, &ProxyConfig::Direct)
    }

    pub fn with_proxy(
        endpoint: Endpoint,
        timeout: Duration,
        proxy: &ProxyConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = proxy.apply(Client::builder().timeout(timeout))?.build()?;
        Ok(Self { client, endpoint })
    }

    fn payload(&self, magnet: &str) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": RPC_ID,
            "method": "aria2.addUri",
            "params": [format!("token:{}", self.endpoint.token()), [magnet]],
        })
    }
}

#[async_trait]
impl MagnetSink for Aria2Sink {
    fn destination(&self) -> Destination {
        Destination::Aria2
    }

    async fn add_magnet(&self, magnet: &str) -> Result<(), DispatchSendError> {
        let response = self
            .client
            .post(self.endpoint.url().clone())
            .json(&self.payload(magnet))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "aria2 returned an error status");
            return Err(DispatchSendError::Status {
                code: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| DispatchSendError::InvalidResponse(e.to_string()))?;

        match reply.get("error") {
            None | Some(Value::Null) => Ok(()),
            Some(error) => {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                Err(DispatchSendError::Rejected(message))
            }
        }
    }
}
