//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for reconciliation runs.
//!
//! # Metrics
//!
//! - `reconciliation_runs_total` - Completed runs
//! - `reconciliation_records_total{status}` - Records emitted per status
//! - `reconciliation_match_rate` - Match rate of the last run (percent)
//! - `reconciliation_unmatched_usd` - At-risk USD of the last run
//!
//! Every `Metrics` owns its registry, so independent reconcilers never share
//! counters.

use crate::types::{ReconciliationRecord, ReconciliationStatus, ReconciliationSummary};
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Completed runs
    pub runs_total: IntCounter,

    /// Records emitted, by status
    pub records_total: IntCounterVec,

    /// Match rate of the last run
    pub match_rate: Gauge,

    /// Unmatched USD of the last run
    pub unmatched_usd: Gauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("runs_total", &self.runs_total.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let runs_total =
            IntCounter::new("reconciliation_runs_total", "Completed reconciliation runs")?;
        registry.register(Box::new(runs_total.clone()))?;

        let records_total = IntCounterVec::new(
            Opts::new(
                "reconciliation_records_total",
                "Reconciliation records emitted by status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(records_total.clone()))?;

        let match_rate = Gauge::new(
            "reconciliation_match_rate",
            "Match rate of the last run in percent",
        )?;
        registry.register(Box::new(match_rate.clone()))?;

        let unmatched_usd = Gauge::new(
            "reconciliation_unmatched_usd",
            "At-risk USD value of the last run",
        )?;
        registry.register(Box::new(unmatched_usd.clone()))?;

        Ok(Self {
            runs_total,
            records_total,
            match_rate,
            unmatched_usd,
            registry,
        })
    }

    /// Record the outcome of one run
    pub fn record_run(&self, records: &[ReconciliationRecord], summary: &ReconciliationSummary) {
        self.runs_total.inc();

        for status in ReconciliationStatus::ALL {
            let count = records.iter().filter(|r| r.status == status).count() as u64;
            if count > 0 {
                self.records_total
                    .with_label_values(&[status.as_str()])
                    .inc_by(count);
            }
        }

        self.match_rate.set(summary.match_rate);
        self.unmatched_usd
            .set(summary.unmatched_usd.to_f64().unwrap_or(0.0));
    }

    /// Records counted so far for one status
    pub fn records_for(&self, status: ReconciliationStatus) -> u64 {
        self.records_total.with_label_values(&[status.as_str()]).get()
    }

    /// Render the registry in the Prometheus text format
    pub fn render(&self) -> crate::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
