pub mod config;
pub mod crawler;
pub mod dispatch;
pub mod extractor;
pub mod fetcher;
pub mod metrics;
pub mod store;
pub mod testing;
pub mod torrent;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
    SanitizedConfig,
};
pub use crawler::{Crawler, ScrapeError, ScrapeReport};
pub use dispatch::{
    create_sink, Aria2Sink, DispatchPlan, DispatchReport, DispatchSendError, DispatchService,
    Endpoint, MagnetSink, TransmissionSink,
};
pub use extractor::{ListingExtractor, ListingLayout, ParseError, TableListingExtractor};
pub use fetcher::{FetchError, FetchedPage, PageFetcher, ProxyConfig, RetryPolicy};
pub use store::{InsertOutcome, SqliteTorrentStore, StoreError, StoreStats, TorrentStore};
pub use torrent::{DeliveryState, Destination, Torrent};
