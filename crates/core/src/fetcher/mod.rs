//! Listing page retrieval.
//!
//! Plain GETs over a direct, HTTP-proxied or SOCKS5-proxied client with a
//! bounded, linearly backed-off retry loop. Stateless apart from the
//! connection pool.

mod client;
mod proxy;
mod types;

pub use client::{read_page_file, PageFetcher};
pub use proxy::ProxyConfig;
pub use types::*;
