//! Torrent record model.
//!
//! A [`Torrent`] is one listing entry scraped from the index. Its `id` is the
//! index's own identifier and doubles as the storage primary key.

mod types;

pub use types::*;
