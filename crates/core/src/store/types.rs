//! Types for torrent storage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database could not be opened or its schema created.
    #[error("Failed to initialize storage: {0}")]
    Init(String),

    /// An insert or update failed.
    #[error("Storage write failed: {0}")]
    Write(String),

    /// A query failed.
    #[error("Storage read failed: {0}")]
    Read(String),
}

impl StoreError {
    pub(crate) fn init(e: impl ToString) -> Self {
        StoreError::Init(e.to_string())
    }

    pub(crate) fn write(e: impl ToString) -> Self {
        StoreError::Write(e.to_string())
    }

    pub(crate) fn read(e: impl ToString) -> Self {
        StoreError::Read(e.to_string())
    }
}

/// Result of a batch insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    /// Ids of the rows that were newly written, in input order.
    pub inserted: Vec<u64>,
    /// Records skipped because their id was already stored.
    pub duplicates: usize,
    /// Records skipped because they had no valid id.
    pub rejected: usize,
}

impl InsertOutcome {
    /// Number of newly written rows.
    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }
}

/// Aggregate counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: u64,
    pub with_magnet: u64,
}
