//! Torrent storage.
//!
//! Records are written once (first write wins) and only their per-destination
//! delivery flags change afterwards. Nothing in this module deletes records.

mod sqlite;
mod types;

pub use sqlite::SqliteTorrentStore;
pub use types::*;

use crate::torrent::{Destination, Torrent};

/// Trait for torrent record storage.
pub trait TorrentStore: Send + Sync {
    /// Insert a record unless its id is already stored.
    ///
    /// Returns `true` if a new row was written. Duplicates and invalid
    /// records (id 0) return `false` and are not errors.
    fn insert_one(&self, torrent: &Torrent) -> Result<bool, StoreError>;

    /// Insert many records in a single transaction.
    ///
    /// Duplicate ids are skipped without affecting the rest of the batch. Any
    /// other failure rolls the whole batch back.
    fn insert_batch(&self, torrents: &[Torrent]) -> Result<InsertOutcome, StoreError>;

    /// Get a record by id.
    fn get(&self, id: u64) -> Result<Option<Torrent>, StoreError>;

    /// Records whose name contains `pattern`, newest (highest id) first.
    fn query_by_name(&self, pattern: &str, limit: u32) -> Result<Vec<Torrent>, StoreError>;

    /// The newest records, highest id first.
    fn query_latest(&self, limit: u32) -> Result<Vec<Torrent>, StoreError>;

    /// Records with a magnet that have not been delivered to `destination`,
    /// highest id first.
    fn pending_delivery(
        &self,
        destination: Destination,
        limit: u32,
    ) -> Result<Vec<Torrent>, StoreError>;

    fn count_all(&self) -> Result<u64, StoreError>;

    fn count_with_magnet(&self) -> Result<u64, StoreError>;

    /// Number of records whose name contains `pattern`.
    fn count_matching(&self, pattern: &str) -> Result<u64, StoreError>;

    /// Flag `id` as delivered to `destination`.
    ///
    /// Returns `false` if no such record exists. Repeating the call is harmless.
    fn mark_delivered(&self, id: u64, destination: Destination) -> Result<bool, StoreError>;

    /// Totals for reporting.
    fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            total: self.count_all()?,
            with_magnet: self.count_with_magnet()?,
        })
    }
}
