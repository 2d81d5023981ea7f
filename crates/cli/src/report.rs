//! Human-readable output for the operator.

use std::fmt::Write;

use crawler_core::{DispatchPlan, DispatchReport, ScrapeReport, StoreStats, Torrent};

/// Name column width; names are cut one short of it.
const NAME_WIDTH: usize = 50;
const RULE_WIDTH: usize = 135;
/// Newly inserted records echoed after a scrape.
const PREVIEW_COUNT: usize = 5;

/// Cut `s` to at most `max_chars` characters.
pub fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Fixed-width table of records with their delivery flags.
pub fn torrent_table(records: &[Torrent]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<50} {:<25} {:<10} {:<10} {:<12} {:<12}",
        "ID", "Name", "Category", "Size", "Date", "To Trans", "To Aria2"
    );
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));

    for t in records {
        let _ = writeln!(
            out,
            "{:<10} {:<50} {:<25} {:<10} {:<10} {:<12} {:<12}",
            t.id,
            truncate(&t.name, NAME_WIDTH - 1),
            t.category,
            t.size,
            t.date,
            yes_no(t.delivered.transmission),
            yes_no(t.delivered.aria2),
        );
    }
    out
}

pub fn stats_summary(stats: &StoreStats) -> String {
    format!(
        "Total torrents in database: {}\nTorrents with magnet links: {}\n",
        stats.total, stats.with_magnet
    )
}

/// Inserted count, a preview of the new records, then totals.
pub fn scrape_summary(report: &ScrapeReport, stats: &StoreStats) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Scraped {} torrents from {}, {} new",
        report.extracted,
        report.source,
        report.inserted_count()
    );
    for t in report.inserted.iter().take(PREVIEW_COUNT) {
        let _ = writeln!(out, "Torrent {}: {} ({})", t.id, t.name, t.category);
    }
    if report.inserted.len() > PREVIEW_COUNT {
        let _ = writeln!(out, "... and {} more", report.inserted.len() - PREVIEW_COUNT);
    }
    out.push_str(&stats_summary(stats));
    out
}

pub fn dispatch_summary(report: &DispatchReport) -> String {
    let mut out = String::new();
    if report.attempted == 0 {
        let _ = writeln!(out, "No magnet links to send to {}", report.destination);
        return out;
    }

    for failure in &report.failures {
        let _ = writeln!(
            out,
            "Failed to send torrent {} to {}: {}",
            failure.id, report.destination, failure.error
        );
    }
    let _ = writeln!(
        out,
        "Successfully sent {} out of {} magnet links to {}",
        report.succeeded(),
        report.attempted,
        report.destination
    );
    if report.succeeded() > 0 {
        let _ = writeln!(
            out,
            "Marked {} torrent records as delivered to {}",
            report.marked, report.destination
        );
    }
    if report.mark_errors > 0 {
        let _ = writeln!(
            out,
            "Failed to record {} deliveries to {}",
            report.mark_errors, report.destination
        );
    }
    out
}

pub fn plan_summary(plan: &DispatchPlan) -> String {
    let mut out = String::new();
    if plan.is_empty() {
        let _ = writeln!(out, "Dry run mode - nothing to send to {}", plan.destination);
        return out;
    }

    let _ = writeln!(
        out,
        "Dry run mode - would send {} magnet links to {}:",
        plan.len(),
        plan.destination
    );
    for (i, t) in plan.records.iter().enumerate() {
        let _ = writeln!(out, "{}. [{}] {}", i + 1, t.id, t.magnet);
    }
    out
}
