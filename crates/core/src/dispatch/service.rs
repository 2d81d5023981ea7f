//! Dispatch passes over the configured sinks.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{eligible_for, DispatchFailure, DispatchPlan, DispatchReport, MagnetSink};
use crate::metrics;
use crate::store::{StoreError, TorrentStore};
use crate::torrent::{Destination, Torrent};

/// Sends pending magnets to every sink and records confirmed deliveries.
///
/// Sinks are processed one after another and each record is sent on its own,
/// so a failing record or destination never blocks the rest.
pub struct DispatchService {
    sinks: Vec<Box<dyn MagnetSink>>,
    store: Arc<dyn TorrentStore>,
}

impl DispatchService {
    pub fn new(store: Arc<dyn TorrentStore>) -> Self {
        Self {
            sinks: Vec::new(),
            store,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn MagnetSink>) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn MagnetSink>) {
        self.sinks.push(sink);
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.sinks.iter().map(|s| s.destination()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Send the eligible subset of `records` to every sink.
    pub async fn dispatch(&self, records: &[Torrent]) -> Vec<DispatchReport> {
        let mut reports = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let eligible = eligible_for(records, sink.destination());
            reports.push(self.run_pass(sink.as_ref(), &eligible).await);
        }
        reports
    }

    /// Send up to `limit` pending records per sink, selected from storage.
    pub async fn dispatch_pending(&self, limit: u32) -> Result<Vec<DispatchReport>, StoreError> {
        let mut reports = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let pending = self.store.pending_delivery(sink.destination(), limit)?;
            reports.push(self.run_pass(sink.as_ref(), &pending).await);
        }
        Ok(reports)
    }

    /// What [`dispatch`](Self::dispatch) would send. No network, no writes.
    pub fn plan(&self, records: &[Torrent]) -> Vec<DispatchPlan> {
        self.sinks
            .iter()
            .map(|sink| DispatchPlan {
                destination: sink.destination(),
                records: eligible_for(records, sink.destination()),
            })
            .collect()
    }

    /// What [`dispatch_pending`](Self::dispatch_pending) would send.
    pub fn plan_pending(&self, limit: u32) -> Result<Vec<DispatchPlan>, StoreError> {
        self.sinks
            .iter()
            .map(|sink| {
                Ok(DispatchPlan {
                    destination: sink.destination(),
                    records: self.store.pending_delivery(sink.destination(), limit)?,
                })
            })
            .collect()
    }

    async fn run_pass(&self, sink: &dyn MagnetSink, records: &[Torrent]) -> DispatchReport {
        let destination = sink.destination();
        let mut report = DispatchReport::new(destination);

        if records.is_empty() {
            debug!(destination = %destination, "Nothing to dispatch");
            return report;
        }

        info!(destination = %destination, count = records.len(), "Dispatching magnets");

        for torrent in records {
            report.attempted += 1;
            match sink.add_magnet(&torrent.magnet).await {
                Ok(()) => {
                    debug!(id = torrent.id, destination = %destination, "Magnet delivered");
                    metrics::DISPATCH_SENDS
                        .with_label_values(&[destination.as_str(), "success"])
                        .inc();
                    report.delivered.push(torrent.id);
                }
                Err(e) => {
                    warn!(id = torrent.id, destination = %destination, error = %e, "Magnet delivery failed");
                    metrics::DISPATCH_SENDS
                        .with_label_values(&[destination.as_str(), "failure"])
                        .inc();
                    report.failures.push(DispatchFailure {
                        id: torrent.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        for id in &report.delivered {
            match self.store.mark_delivered(*id, destination) {
                Ok(true) => {
                    report.marked += 1;
                    metrics::DELIVERY_MARKS
                        .with_label_values(&[destination.as_str(), "marked"])
                        .inc();
                }
                Ok(false) => {
                    metrics::DELIVERY_MARKS
                        .with_label_values(&[destination.as_str(), "missing"])
                        .inc();
                }
                Err(e) => {
                    error!(id, destination = %destination, error = %e, "Failed to record delivery");
                    report.mark_errors += 1;
                    metrics::DELIVERY_MARKS
                        .with_label_values(&[destination.as_str(), "error"])
                        .inc();
                }
            }
        }

        info!(
            destination = %destination,
            succeeded = report.succeeded(),
            failed = report.failed(),
            marked = report.marked,
            "Dispatch pass finished"
        );
        report
    }
}
