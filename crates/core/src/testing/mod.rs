//! Testing utilities and mock implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use crawler_core::testing::{fixtures, MockMagnetSink};
//!
//! let page = fixtures::listing_page(&[
//!     fixtures::listing_row(1, "First", Some("magnet:?xt=urn:btih:1")),
//!     fixtures::listing_row(2, "Second", None),
//! ]);
//! let report = crawler.ingest("fixture", &page)?;
//! ```

mod mock_magnet_sink;

pub use mock_magnet_sink::MockMagnetSink;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::torrent::Torrent;

    /// One listing row in the index's table markup.
    ///
    /// The title cell carries a comment-count link before the title link, and
    /// the link cell a torrent-file link before the magnet.
    pub fn listing_row(id: u64, name: &str, magnet: Option<&str>) -> String {
        let magnet_link = magnet
            .map(|m| format!(r#"<a href="{}"><i class="fa fa-fw fa-magnet"></i></a>"#, m))
            .unwrap_or_default();

        format!(
            r##"<tr class="default">
  <td><a href="/?c=1_2" title="Anime - English-translated"><img src="/static/img/icons/nyaa/1_2.png" alt="Anime - English-translated"></a></td>
  <td colspan="2">
    <a href="/view/{id}#comments" class="comments" title="2 comments"><i class="fa fa-comments-o"></i>2</a>
    <a href="/view/{id}" title="{name}">{name}</a>
  </td>
  <td class="text-center">
    <a href="/download/{id}.torrent"><i class="fa fa-fw fa-download"></i></a>
    {magnet_link}
  </td>
  <td class="text-center">1.2 GiB</td>
  <td class="text-center" data-timestamp="1700000000">2023-11-14 22:13</td>
  <td class="text-center">10</td>
  <td class="text-center">2</td>
  <td class="text-center">100</td>
</tr>"##,
            id = id,
            name = name,
            magnet_link = magnet_link,
        )
    }

    /// A row whose title link carries no `/view/<id>`.
    pub fn listing_row_without_id(name: &str) -> String {
        format!(
            r#"<tr class="default">
  <td><a href="/?c=1_2" title="Anime"></a></td>
  <td colspan="2"><a href="/user/uploader">{}</a></td>
  <td class="text-center"><a href="magnet:?xt=urn:btih:orphan"></a></td>
  <td class="text-center">1 MiB</td>
  <td class="text-center">2023-11-14 22:13</td>
</tr>"#,
            name
        )
    }

    /// Wrap rows in a full listing page.
    pub fn listing_page(rows: &[String]) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Listing</title></head>
<body>
<div class="table-responsive">
<table class="table table-bordered table-hover table-striped torrent-list">
<thead><tr><th>Category</th><th>Name</th><th>Link</th><th>Size</th><th>Date</th></tr></thead>
<tbody>
{}
</tbody>
</table>
</div>
</body>
</html>"#,
            rows.join("\n")
        )
    }

    /// A record as the extractor would produce it from [`listing_row`].
    pub fn torrent(id: u64, name: &str, magnet: Option<&str>) -> Torrent {
        let torrent = Torrent::new(id, name)
            .with_category("Anime - English-translated")
            .with_size_and_date("1.2 GiB", "2023-11-14 22:13");
        match magnet {
            Some(m) => torrent.with_magnet(m),
            None => torrent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures;
    use crate::extractor::{ListingExtractor, ListingLayout, TableListingExtractor};

    #[test]
    fn test_fixture_rows_extract_to_fixture_torrents() {
        let extractor = TableListingExtractor::new(ListingLayout::default()).unwrap();
        let page = fixtures::listing_page(&[
            fixtures::listing_row(7, "Seven", Some("magnet:?xt=urn:btih:7")),
            fixtures::listing_row(8, "Eight", None),
            fixtures::listing_row_without_id("Nobody"),
        ]);

        let records = extractor.extract(&page).unwrap();
        assert_eq!(
            records,
            vec![
                fixtures::torrent(7, "Seven", Some("magnet:?xt=urn:btih:7")),
                fixtures::torrent(8, "Eight", None),
            ]
        );
    }
}
