//! Prometheus exposition for cron-style runs.
//!
//! The process is short-lived, so metrics are written to a file on exit for a
//! node-exporter textfile collector instead of being served.

use std::path::Path;

use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

fn register_metrics(registry: &Registry) {
    for metric in crawler_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Write the exposition to `path`, replacing it atomically.
pub fn write_metrics_file(path: &Path) -> std::io::Result<()> {
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, encode_metrics())?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawler_core::metrics::{DISPATCH_SENDS, FETCH_ATTEMPTS};

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        FETCH_ATTEMPTS.with_label_values(&["success"]).inc();

        let output = encode_metrics();
        assert!(output.contains("crawler_fetch_attempts_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_write_metrics_file() {
        DISPATCH_SENDS
            .with_label_values(&["aria2", "success"])
            .inc();

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("crawler.prom");
        write_metrics_file(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("crawler_dispatch_sends_total"));
        assert!(!dir.path().join("crawler.prom.tmp").exists());
    }
}
