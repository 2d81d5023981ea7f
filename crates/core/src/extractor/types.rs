//! Types for listing extraction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while extracting records from a document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Document is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("Invalid id pattern: {0}")]
    Pattern(String),
}

/// Column layout of a table-shaped listing page.
///
/// Column indexes are zero-based positions of `<td>` cells within a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingLayout {
    /// Layout name for logging.
    pub name: String,
    /// CSS selector matching one listing row.
    pub row_selector: String,
    /// Cell whose first anchor carries the category in its `title` attribute.
    pub category_column: usize,
    /// Cell holding the title anchor (optionally preceded by a comments link).
    pub title_column: usize,
    /// Cell holding download links, one of which may be a magnet.
    pub links_column: usize,
    pub size_column: usize,
    pub date_column: usize,
    /// Substring identifying a comment-count link in the title cell.
    pub comments_marker: String,
    /// Regex with one capture group for the numeric id in the title href.
    pub id_pattern: String,
}

impl Default for ListingLayout {
    /// The nyaa-style listing: category, title, links, size, date, then
    /// seeders/leechers/downloads which are ignored.
    fn default() -> Self {
        Self {
            name: "nyaa-table-v1".to_string(),
            row_selector: "tbody tr".to_string(),
            category_column: 0,
            title_column: 1,
            links_column: 2,
            size_column: 3,
            date_column: 4,
            comments_marker: "#comments".to_string(),
            id_pattern: r"/view/(\d+)".to_string(),
        }
    }
}
