//! Transmission RPC sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{DispatchSendError, Endpoint, EndpointAuth, MagnetSink};
use crate::fetcher::ProxyConfig;
use crate::metrics;
use crate::torrent::Destination;

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

#[derive(Serialize)]
struct TorrentAddRequest<'a> {
    method: &'static str,
    arguments: TorrentAddArguments<'a>,
}

#[derive(Serialize)]
struct TorrentAddArguments<'a> {
    filename: &'a str,
}

#[derive(Deserialize)]
struct RpcReply {
    result: String,
}

/// Sends magnets with `torrent-add`.
///
/// Transmission answers 409 with a fresh session id until the request carries
/// a current one. The last id seen is cached and reused; a 409 re-issues the
/// request once with the new id.
pub struct TransmissionSink {
    client: Client,
    endpoint: Endpoint,
    session: RwLock<Option<String>>,
}

impl TransmissionSink {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_proxy(endpoint, timeout, &ProxyConfig::Direct)
    }

    pub fn with_proxy(
        endpoint: Endpoint,
        timeout: Duration,
        proxy: &ProxyConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = proxy.apply(Client::builder().timeout(timeout))?.build()?;

        Ok(Self {
            client,
            endpoint,
            session: RwLock::new(None),
        })
    }

    /// Session id currently cached, if any.
    pub async fn session_id(&self) -> Option<String> {
        self.session.read().await.clone()
    }

    async fn post(
        &self,
        request: &TorrentAddRequest<'_>,
        session: Option<&str>,
    ) -> Result<Response, DispatchSendError> {
        let mut builder = self.client.post(self.endpoint.url().clone()).json(request);

        if let EndpointAuth::Basic { username, password } = self.endpoint.auth() {
            if !username.is_empty() && !password.is_empty() {
                builder = builder.basic_auth(username, Some(password));
            }
        }
        if let Some(session) = session {
            builder = builder.header(SESSION_HEADER, session);
        }

        Ok(builder.send().await?)
    }
}

#[async_trait]
impl MagnetSink for TransmissionSink {
    fn destination(&self) -> Destination {
        Destination::Transmission
    }

    async fn add_magnet(&self, magnet: &str) -> Result<(), DispatchSendError> {
        let request = TorrentAddRequest {
            method: "torrent-add",
            arguments: TorrentAddArguments { filename: magnet },
        };

        let cached = self.session.read().await.clone();
        let mut response = self.post(&request, cached.as_deref()).await?;

        if response.status() == StatusCode::CONFLICT {
            let session_id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(DispatchSendError::MissingSessionId)?;

            debug!("Transmission session handshake");
            metrics::DISPATCH_HANDSHAKES
                .with_label_values(&[Destination::Transmission.as_str()])
                .inc();
            *self.session.write().await = Some(session_id.clone());

            response = self.post(&request, Some(&session_id)).await?;
        }

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Transmission returned an error status");
            return Err(DispatchSendError::Status {
                code: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let reply: RpcReply = response
            .json()
            .await
            .map_err(|e| DispatchSendError::InvalidResponse(e.to_string()))?;

        if reply.result != "success" {
            return Err(DispatchSendError::Rejected(reply.result));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sink(server: &MockServer, raw_prefix: &str) -> TransmissionSink {
        let raw = format!("{}{}/transmission/rpc", raw_prefix, server.uri());
        let endpoint = Endpoint::parse_credentials(&raw).unwrap();
        TransmissionSink::new(endpoint, Duration::from_secs(5)).unwrap()
    }

    fn success() -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({"arguments": {}, "result": "success"}))
    }

    #[tokio::test]
    async fn test_sends_torrent_add_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({
                "method": "torrent-add",
                "arguments": {"filename": "magnet:?xt=urn:btih:abc"}
            })))
            .respond_with(success())
            .expect(1)
            .mount(&server)
            .await;

        sink(&server, "")
            .add_magnet("magnet:?xt=urn:btih:abc")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_session_handshake_retries_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(SESSION_HEADER, "token-1"))
            .respond_with(success())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).insert_header(SESSION_HEADER, "token-1"))
            .expect(1)
            .mount(&server)
            .await;

        let sink = sink(&server, "");
        sink.add_magnet("magnet:?xt=urn:btih:abc").await.unwrap();
        assert_eq!(sink.session_id().await.as_deref(), Some("token-1"));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cached_session_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(SESSION_HEADER, "token-1"))
            .respond_with(success())
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).insert_header(SESSION_HEADER, "token-1"))
            .expect(1)
            .mount(&server)
            .await;

        let sink = sink(&server, "");
        sink.add_magnet("magnet:?xt=urn:btih:1").await.unwrap();
        sink.add_magnet("magnet:?xt=urn:btih:2").await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_repeated_conflict_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).insert_header(SESSION_HEADER, "again"))
            .expect(2)
            .mount(&server)
            .await;

        let err = sink(&server, "")
            .add_magnet("magnet:?xt=urn:btih:abc")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchSendError::Status { code: 409, .. }));
    }

    #[tokio::test]
    async fn test_conflict_without_session_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409))
            .expect(1)
            .mount(&server)
            .await;

        let err = sink(&server, "")
            .add_magnet("magnet:?xt=urn:btih:abc")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchSendError::MissingSessionId));
    }

    #[tokio::test]
    async fn test_non_success_result_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"result": "invalid or corrupt torrent file"})),
            )
            .mount(&server)
            .await;

        let err = sink(&server, "")
            .add_magnet("magnet:?xt=urn:btih:abc")
            .await
            .unwrap_err();
        assert!(
            matches!(err, DispatchSendError::Rejected(ref r) if r == "invalid or corrupt torrent file")
        );
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = sink(&server, "")
            .add_magnet("magnet:?xt=urn:btih:abc")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchSendError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_basic_auth_from_endpoint() {
        let server = MockServer::start().await;
        // "admin:secret" in base64
        Mock::given(method("POST"))
            .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
            .respond_with(success())
            .expect(1)
            .mount(&server)
            .await;

        sink(&server, "admin:secret@")
            .add_magnet("magnet:?xt=urn:btih:abc")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_auth_header_without_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(success())
            .mount(&server)
            .await;

        sink(&server, "")
            .add_magnet("magnet:?xt=urn:btih:abc")
            .await
            .unwrap();
    }
}
