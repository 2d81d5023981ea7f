//! Table listing extractor.

use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{ListingExtractor, ListingLayout, ParseError};
use crate::metrics;
use crate::torrent::Torrent;

/// Extracts records from a table where each `<tr>` is one torrent.
pub struct TableListingExtractor {
    layout: ListingLayout,
    row_selector: Selector,
    anchor_selector: Selector,
    id_regex: Regex,
}

impl TableListingExtractor {
    /// Compile the selectors and id pattern of `layout`.
    pub fn new(layout: ListingLayout) -> Result<Self, ParseError> {
        let row_selector = parse_selector(&layout.row_selector)?;
        let anchor_selector = parse_selector("a")?;
        let id_regex =
            Regex::new(&layout.id_pattern).map_err(|e| ParseError::Pattern(e.to_string()))?;

        Ok(Self {
            layout,
            row_selector,
            anchor_selector,
            id_regex,
        })
    }

    pub fn layout(&self) -> &ListingLayout {
        &self.layout
    }

    /// Parse one row into a candidate. The id is 0 when it could not be read.
    fn parse_row(&self, row: ElementRef<'_>) -> Torrent {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "td")
            .collect();

        let mut torrent = Torrent::default();

        if let Some(title) = cells
            .get(self.layout.title_column)
            .and_then(|cell| self.title_anchor(*cell))
        {
            if let Some(href) = title.value().attr("href") {
                torrent.id = self.parse_id(href);
            }
            torrent.name = trimmed_text(title);
        }

        torrent.category = cells
            .get(self.layout.category_column)
            .and_then(|cell| cell.select(&self.anchor_selector).next())
            .and_then(|a| a.value().attr("title"))
            .map(str::to_string)
            .unwrap_or_default();

        torrent.magnet = cells
            .get(self.layout.links_column)
            .and_then(|cell| {
                cell.select(&self.anchor_selector)
                    .filter_map(|a| a.value().attr("href"))
                    .find(|href| href.starts_with("magnet:"))
            })
            .map(str::to_string)
            .unwrap_or_default();

        torrent.size = cells
            .get(self.layout.size_column)
            .map(|cell| trimmed_text(*cell))
            .unwrap_or_default();

        torrent.date = cells
            .get(self.layout.date_column)
            .map(|cell| trimmed_text(*cell))
            .unwrap_or_default();

        torrent
    }

    /// Pick the title anchor, skipping a leading comment-count link.
    fn title_anchor<'a>(&self, cell: ElementRef<'a>) -> Option<ElementRef<'a>> {
        let mut anchors = cell.select(&self.anchor_selector);
        let first = anchors.next()?;

        let is_comments_link = first
            .value()
            .attr("href")
            .is_some_and(|href| href.contains(&self.layout.comments_marker));

        if is_comments_link {
            if let Some(second) = anchors.next() {
                return Some(second);
            }
        }
        Some(first)
    }

    fn parse_id(&self, href: &str) -> u64 {
        self.id_regex
            .captures(href)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .and_then(|id| u64::try_from(id).ok())
            .unwrap_or(0)
    }
}

impl ListingExtractor for TableListingExtractor {
    fn name(&self) -> &str {
        &self.layout.name
    }

    fn extract(&self, document: &str) -> Result<Vec<Torrent>, ParseError> {
        let html = Html::parse_document(document);

        let mut rows = 0usize;
        let mut records = Vec::new();
        for row in html.select(&self.row_selector) {
            rows += 1;
            let torrent = self.parse_row(row);
            if torrent.is_valid() {
                records.push(torrent);
            } else {
                debug!(name = %torrent.name, "Dropping row without a valid id");
            }
        }

        metrics::ROWS_EXTRACTED
            .with_label_values(&["valid"])
            .inc_by(records.len() as u64);
        metrics::ROWS_EXTRACTED
            .with_label_values(&["dropped"])
            .inc_by((rows - records.len()) as u64);

        debug!(
            layout = %self.layout.name,
            rows,
            records = records.len(),
            "Extracted listing"
        );
        Ok(records)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn trimmed_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
