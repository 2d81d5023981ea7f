//! Listing page extraction.
//!
//! The index's markup is an external, versioned format. Everything that knows
//! about column positions lives behind [`ListingExtractor`], so a layout change
//! never touches storage or dispatch.

mod listing;
mod types;

pub use listing::TableListingExtractor;
pub use types::*;

use crate::torrent::Torrent;

/// Trait for turning a listing document into torrent records.
pub trait ListingExtractor: Send + Sync {
    /// Layout name for logging.
    fn name(&self) -> &str;

    /// Extract every valid record from `document`.
    ///
    /// Rows without a positive id are dropped. Pure: the same document always
    /// yields the same records.
    fn extract(&self, document: &str) -> Result<Vec<Torrent>, ParseError>;

    /// Extract from raw bytes, which must be UTF-8.
    fn extract_bytes(&self, document: &[u8]) -> Result<Vec<Torrent>, ParseError> {
        let text = std::str::from_utf8(document).map_err(|e| ParseError::Encoding(e.to_string()))?;
        self.extract(text)
    }
}
