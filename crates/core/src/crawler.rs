//! Ingestion path: fetch (or read) a listing, extract records, store them.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument};

use crate::extractor::{ListingExtractor, ParseError};
use crate::fetcher::{read_page_file, FetchError, PageFetcher};
use crate::metrics;
use crate::store::{InsertOutcome, StoreError, TorrentStore};
use crate::torrent::Torrent;

/// Errors that abort one scrape. Stored state is never left half-written.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Storage failed: {0}")]
    Store(#[from] StoreError),
}

/// Result of one scrape.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    /// Where the document came from (URL or file path).
    pub source: String,
    /// Fetch attempts, 0 for local files.
    pub attempts: u32,
    /// Backoff slept between fetch attempts.
    pub waited: Duration,
    /// Valid records the extractor produced.
    pub extracted: usize,
    pub outcome: InsertOutcome,
    /// Newly inserted records, in document order.
    pub inserted: Vec<Torrent>,
}

impl ScrapeReport {
    pub fn inserted_count(&self) -> usize {
        self.outcome.inserted_count()
    }
}

/// Runs fetch -> extract -> insert_batch.
pub struct Crawler {
    fetcher: PageFetcher,
    extractor: Box<dyn ListingExtractor>,
    store: Arc<dyn TorrentStore>,
}

impl Crawler {
    pub fn new(
        fetcher: PageFetcher,
        extractor: Box<dyn ListingExtractor>,
        store: Arc<dyn TorrentStore>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn TorrentStore> {
        &self.store
    }

    /// Fetch `url` and ingest its listing.
    #[instrument(skip(self), fields(layout = self.extractor.name()))]
    pub async fn scrape_url(&self, url: &str) -> Result<ScrapeReport, ScrapeError> {
        let page = self.fetcher.fetch(url).await?;
        let mut report = self.ingest(url, &page.body)?;
        report.attempts = page.attempts;
        report.waited = page.waited;
        Ok(report)
    }

    /// Ingest a listing page saved on disk.
    ///
    /// A file that is not UTF-8 fails as [`ParseError::Encoding`].
    #[instrument(skip(self), fields(layout = self.extractor.name()))]
    pub async fn scrape_file(&self, path: &Path) -> Result<ScrapeReport, ScrapeError> {
        let bytes = read_page_file(path).await?;
        let records = self.extractor.extract_bytes(&bytes)?;
        self.store_records(&path.display().to_string(), records)
    }

    /// Extract and store records from an already-loaded document.
    pub fn ingest(&self, source: &str, document: &str) -> Result<ScrapeReport, ScrapeError> {
        let records = self.extractor.extract(document)?;
        self.store_records(source, records)
    }

    fn store_records(&self, source: &str, records: Vec<Torrent>) -> Result<ScrapeReport, ScrapeError> {
        let outcome = self.store.insert_batch(&records)?;

        metrics::RECORDS_INSERTED
            .with_label_values(&["inserted"])
            .inc_by(outcome.inserted_count() as u64);
        metrics::RECORDS_INSERTED
            .with_label_values(&["duplicate"])
            .inc_by(outcome.duplicates as u64);
        metrics::RECORDS_INSERTED
            .with_label_values(&["rejected"])
            .inc_by(outcome.rejected as u64);

        // A repeated id only counts at its first row; later rows were skipped.
        let mut fresh: HashSet<u64> = outcome.inserted.iter().copied().collect();
        let inserted: Vec<Torrent> = records
            .iter()
            .filter(|t| fresh.remove(&t.id))
            .cloned()
            .collect();

        info!(
            source,
            extracted = records.len(),
            inserted = outcome.inserted_count(),
            duplicates = outcome.duplicates,
            "Ingested listing"
        );

        Ok(ScrapeReport {
            source: source.to_string(),
            attempts: 0,
            waited: Duration::ZERO,
            extracted: records.len(),
            outcome,
            inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ListingLayout, TableListingExtractor};
    use crate::fetcher::{ProxyConfig, RetryPolicy};
    use crate::store::SqliteTorrentStore;
    use crate::testing::fixtures;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn crawler() -> Crawler {
        let fetcher = PageFetcher::new(
            ProxyConfig::Direct,
            Duration::from_secs(5),
            RetryPolicy::new(1, Duration::from_millis(1)),
        )
        .unwrap();
        let extractor = TableListingExtractor::new(ListingLayout::default()).unwrap();
        let store = SqliteTorrentStore::in_memory().unwrap();
        Crawler::new(fetcher, Box::new(extractor), Arc::new(store))
    }

    #[test]
    fn test_ingest_reports_new_records_only() {
        let crawler = crawler();
        let page = fixtures::listing_page(&[
            fixtures::listing_row(10, "Ten", Some("magnet:?xt=urn:btih:10")),
            fixtures::listing_row(11, "Eleven", None),
        ]);

        let first = crawler.ingest("test", &page).unwrap();
        assert_eq!(first.extracted, 2);
        assert_eq!(first.inserted_count(), 2);
        assert_eq!(first.inserted.len(), 2);

        let second = crawler.ingest("test", &page).unwrap();
        assert_eq!(second.extracted, 2);
        assert_eq!(second.inserted_count(), 0);
        assert_eq!(second.outcome.duplicates, 2);
        assert!(second.inserted.is_empty());

        assert_eq!(crawler.store().count_all().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_scrape_file() {
        let crawler = crawler();
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            fixtures::listing_page(&[fixtures::listing_row(
                42,
                "Saved",
                Some("magnet:?xt=urn:btih:42")
            )])
        )
        .unwrap();

        let report = crawler.scrape_file(file.path()).await.unwrap();
        assert_eq!(report.attempts, 0);
        assert_eq!(report.inserted_count(), 1);
        assert_eq!(report.inserted[0].name, "Saved");
        assert_eq!(crawler.store().count_with_magnet().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_scrape_missing_file() {
        let err = crawler()
            .scrape_file(Path::new("/nonexistent/listing.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch(FetchError::File { .. })));
    }

    #[test]
    fn test_repeated_id_previews_first_row_only() {
        let crawler = crawler();
        let page = fixtures::listing_page(&[
            fixtures::listing_row(5, "First", Some("magnet:?xt=urn:btih:first")),
            fixtures::listing_row(5, "Second", Some("magnet:?xt=urn:btih:second")),
        ]);

        let report = crawler.ingest("test", &page).unwrap();
        assert_eq!(report.extracted, 2);
        assert_eq!(report.inserted_count(), 1);
        assert_eq!(report.outcome.duplicates, 1);
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.inserted[0].name, "First");
        assert_eq!(crawler.store().get(5).unwrap().unwrap().name, "First");
    }

    #[tokio::test]
    async fn test_scrape_file_not_utf8_is_parse_error() {
        let crawler = crawler();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"<html><body>\xff\xfe\xfd</body></html>").unwrap();

        let err = crawler.scrape_file(file.path()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(ParseError::Encoding(_))));
        assert_eq!(crawler.store().count_all().unwrap(), 0);
    }

    #[test]
    fn test_empty_listing_inserts_nothing() {
        let crawler = crawler();
        let report = crawler.ingest("empty", &fixtures::listing_page(&[])).unwrap();
        assert_eq!(report.extracted, 0);
        assert_eq!(report.inserted_count(), 0);
    }
}
