use serde::Serialize;
use thiserror::Error;

use crate::torrent::{Destination, Torrent};

/// Errors from sending one magnet to one destination.
#[derive(Debug, Error)]
pub enum DispatchSendError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Session conflict without a session id header")]
    MissingSessionId,

    #[error("Rejected by daemon: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for DispatchSendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DispatchSendError::Timeout
        } else {
            DispatchSendError::Transport(e.to_string())
        }
    }
}

/// A single failed send.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub id: u64,
    pub error: String,
}

/// Outcome of one destination's pass.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub destination: Destination,
    /// Records a send was attempted for.
    pub attempted: usize,
    /// Ids the destination accepted, in send order.
    pub delivered: Vec<u64>,
    pub failures: Vec<DispatchFailure>,
    /// Delivered ids whose flag was written back.
    pub marked: usize,
    /// Delivered ids whose flag could not be written back.
    pub mark_errors: usize,
}

impl DispatchReport {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            attempted: 0,
            delivered: Vec::new(),
            failures: Vec::new(),
            marked: 0,
            mark_errors: 0,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.delivered.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// What a dry run would send to one destination.
#[derive(Debug, Clone)]
pub struct DispatchPlan {
    pub destination: Destination,
    pub records: Vec<Torrent>,
}

impl DispatchPlan {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Records eligible for `destination`: non-empty magnet and not yet delivered.
///
/// Each eligible record appears once, keyed by id, even when two records
/// share a magnet.
pub fn eligible_for(records: &[Torrent], destination: Destination) -> Vec<Torrent> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .filter(|t| t.is_valid() && t.is_pending_for(destination))
        .filter(|t| seen.insert(t.id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligible_skips_missing_magnet_and_delivered() {
        let mut delivered = Torrent::new(3, "Done").with_magnet("magnet:?xt=urn:btih:3");
        delivered.delivered.mark(Destination::Transmission);

        let records = vec![
            Torrent::new(1, "No magnet"),
            Torrent::new(2, "Pending").with_magnet("magnet:?xt=urn:btih:2"),
            delivered,
        ];

        let transmission = eligible_for(&records, Destination::Transmission);
        assert_eq!(transmission.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2]);

        let aria2 = eligible_for(&records, Destination::Aria2);
        assert_eq!(aria2.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_shared_magnet_keeps_both_ids() {
        let records = vec![
            Torrent::new(5, "A").with_magnet("magnet:?xt=urn:btih:same"),
            Torrent::new(6, "B").with_magnet("magnet:?xt=urn:btih:same"),
            Torrent::new(5, "A again").with_magnet("magnet:?xt=urn:btih:same"),
        ];

        let eligible = eligible_for(&records, Destination::Aria2);
        assert_eq!(eligible.iter().map(|t| t.id).collect::<Vec<_>>(), vec![5, 6]);
    }

    #[test]
    fn test_report_counts() {
        let mut report = DispatchReport::new(Destination::Aria2);
        report.attempted = 3;
        report.delivered = vec![1, 2];
        report.failures.push(DispatchFailure {
            id: 3,
            error: "boom".to_string(),
        });
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
    }
}
