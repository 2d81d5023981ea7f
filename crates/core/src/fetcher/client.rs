//! Retrying page fetcher.

use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::{FetchError, FetchedPage, ProxyConfig, RetryPolicy};
use crate::metrics;

/// Fetches listing documents over HTTP with bounded retry.
pub struct PageFetcher {
    client: Client,
    policy: RetryPolicy,
    proxy: ProxyConfig,
}

impl PageFetcher {
    /// Build a fetcher routed through `proxy`, with `timeout` per request.
    pub fn new(
        proxy: ProxyConfig,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self, FetchError> {
        let builder = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nyaa-crawler/", env!("CARGO_PKG_VERSION")));

        let client = proxy
            .apply(builder)
            .and_then(|b| b.build())
            .map_err(|e| FetchError::Client(e.to_string()))?;

        debug!(proxy = proxy.kind(), timeout_secs = timeout.as_secs(), "Page fetcher ready");

        Ok(Self {
            client,
            policy,
            proxy,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn proxy(&self) -> &ProxyConfig {
        &self.proxy
    }

    /// Fetch `url`, retrying transport errors and non-200 statuses.
    ///
    /// Returns the body of the first successful attempt, or the last error
    /// once the policy's attempts are exhausted.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let started = Instant::now();
        let mut attempt = 0u32;
        let mut waited = Duration::ZERO;

        loop {
            attempt += 1;
            debug!(url, attempt, "Fetching page");

            match self.try_fetch(url).await {
                Ok(body) => {
                    metrics::FETCH_ATTEMPTS.with_label_values(&["success"]).inc();
                    metrics::FETCH_DURATION
                        .with_label_values(&["success"])
                        .observe(started.elapsed().as_secs_f64());
                    info!(url, attempt, bytes = body.len(), "Fetched page");
                    return Ok(FetchedPage {
                        url: url.to_string(),
                        body,
                        attempts: attempt,
                        waited,
                    });
                }
                Err(e) => {
                    metrics::FETCH_ATTEMPTS.with_label_values(&[e.kind()]).inc();

                    match self.policy.delay_after(attempt) {
                        Some(delay) => {
                            warn!(
                                url,
                                attempt,
                                max_attempts = self.policy.max_attempts(),
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                "Fetch failed, retrying"
                            );
                            metrics::FETCH_BACKOFFS.inc();
                            waited += delay;
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            warn!(url, attempt, error = %e, "Fetch failed, giving up");
                            metrics::FETCH_DURATION
                                .with_label_values(&["failure"])
                                .observe(started.elapsed().as_secs_f64());
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    /// One GET. Only a 200 counts as success.
    async fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}

/// Read a saved listing page from disk, undecoded.
pub async fn read_page_file(path: &Path) -> Result<Vec<u8>, FetchError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| FetchError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(max_attempts: u32) -> PageFetcher {
        PageFetcher::new(
            ProxyConfig::Direct,
            Duration::from_secs(5),
            RetryPolicy::new(max_attempts, Duration::from_millis(10)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let page = fetcher(3).fetch(&format!("{}/", server.uri())).await.unwrap();
        assert_eq!(page.body, "<html>ok</html>");
        assert_eq!(page.attempts, 1);
        assert_eq!(page.waited, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_fetch_recovers_on_third_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("third time"))
            .expect(1)
            .mount(&server)
            .await;

        let started = Instant::now();
        let page = fetcher(3).fetch(&server.uri()).await.unwrap();
        assert_eq!(page.body, "third time");
        assert_eq!(page.attempts, 3);
        // Exactly two waits: 1 unit then 2 units.
        assert_eq!(page.waited, Duration::from_millis(10 + 20));
        assert!(started.elapsed() >= page.waited);
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = fetcher(3).fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { code: 503, .. }));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let err = fetcher(2).fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { code: 204, .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(
            ProxyConfig::Direct,
            Duration::from_millis(50),
            RetryPolicy::new(1, Duration::from_millis(1)),
        )
        .unwrap();

        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Take a free port from the OS, then close it.
        let uri = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}/", listener.local_addr().unwrap())
        };

        let err = fetcher(1).fetch(&uri).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_read_page_file_returns_raw_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("page.html");
        std::fs::write(&file, b"<html>\xff</html>").unwrap();

        let bytes = read_page_file(&file).await.unwrap();
        assert_eq!(bytes, b"<html>\xff</html>".to_vec());
    }

    #[tokio::test]
    async fn test_read_page_file_missing() {
        let err = read_page_file(Path::new("/nonexistent/page.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::File { .. }));
    }
}
