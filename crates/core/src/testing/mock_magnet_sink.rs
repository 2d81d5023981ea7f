//! Mock magnet sink for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::dispatch::{DispatchSendError, MagnetSink};
use crate::torrent::Destination;

/// Mock implementation of the MagnetSink trait.
///
/// Records every magnet it is handed and fails the ones it was told to.
///
/// # Example
///
/// ```rust,ignore
/// let sink = MockMagnetSink::new(Destination::Aria2);
/// sink.fail_magnet("magnet:?xt=urn:btih:bad").await;
/// let sent = sink.sent_handle();
///
/// let service = DispatchService::new(store).with_sink(Box::new(sink));
/// service.dispatch_pending(10).await?;
///
/// assert_eq!(sent.read().await.len(), 2);
/// ```
#[derive(Debug)]
pub struct MockMagnetSink {
    destination: Destination,
    /// Every magnet passed to add_magnet, failures included.
    sent: Arc<RwLock<Vec<String>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    fail_all: Arc<RwLock<bool>>,
}

impl MockMagnetSink {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            sent: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
            fail_all: Arc::new(RwLock::new(false)),
        }
    }

    /// Make sends of `magnet` fail.
    pub async fn fail_magnet(&self, magnet: &str) {
        self.failing.write().await.insert(magnet.to_string());
    }

    /// Make every send fail.
    pub async fn fail_all(&self) {
        *self.fail_all.write().await = true;
    }

    /// Magnets handed to this sink so far.
    pub async fn sent(&self) -> Vec<String> {
        self.sent.read().await.clone()
    }

    /// Shared view of the sent log, usable after the sink is boxed away.
    pub fn sent_handle(&self) -> Arc<RwLock<Vec<String>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl MagnetSink for MockMagnetSink {
    fn destination(&self) -> Destination {
        self.destination
    }

    async fn add_magnet(&self, magnet: &str) -> Result<(), DispatchSendError> {
        self.sent.write().await.push(magnet.to_string());

        if *self.fail_all.read().await || self.failing.read().await.contains(magnet) {
            return Err(DispatchSendError::Rejected("mock failure".to_string()));
        }
        Ok(())
    }
}
