//! Reconciliation pipeline
//!
//! Runs one reconciliation end to end:
//!
//! 1. **Filter**: narrow both inputs to the configured chain/window
//! 2. **Match**: [`reconcile`]
//! 3. **Flag**: [`detect_duplicates`] when enabled
//! 4. **Report**: summary, per-chain breakdown and anomaly CSV

use crate::config::ReconcilerConfig;
use crate::duplicates::detect_duplicates;
use crate::export::AnomalyExporter;
use crate::matcher::reconcile;
use crate::metrics::Metrics;
use crate::summary::{calculate_summary, summarize_by_chain};
use crate::types::{DbRecord, OnchainRecord, ReconciliationReport};
use crate::Result;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

/// Reconciliation pipeline
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: ReconcilerConfig,
    exporter: AnomalyExporter,
    metrics: Option<Metrics>,
}

impl Reconciler {
    /// Create new reconciler
    pub fn new(config: ReconcilerConfig) -> Result<Self> {
        config.filter.validate()?;
        let exporter = AnomalyExporter::new(config.quoting);

        Ok(Self {
            config,
            exporter,
            metrics: None,
        })
    }

    /// Record every run into `metrics`
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Pipeline configuration
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Attached metrics, if any
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Run a reconciliation
    pub fn run(
        &self,
        db_records: &[DbRecord],
        onchain_records: &[OnchainRecord],
    ) -> Result<ReconciliationReport> {
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            db_records = db_records.len(),
            onchain_records = onchain_records.len(),
            "Starting reconciliation run"
        );

        let filter = &self.config.filter;
        let records = if filter.is_empty() {
            reconcile(db_records, onchain_records)
        } else {
            let db = filter.apply_db(db_records);
            let onchain = filter.apply_onchain(onchain_records);
            info!(
                %run_id,
                db_kept = db.len(),
                onchain_kept = onchain.len(),
                "Applied record filter"
            );
            reconcile(&db, &onchain)
        };

        let records = if self.config.detect_duplicates {
            detect_duplicates(&records)
        } else {
            records
        };

        let summary = calculate_summary(&records);
        let breakdown = summarize_by_chain(&records);
        let anomalies_csv = self.exporter.export(&records)?;

        if summary.total_records > 0 && summary.match_rate < self.config.alert_match_rate {
            warn!(
                %run_id,
                match_rate = summary.match_rate,
                threshold = self.config.alert_match_rate,
                unmatched_usd = %summary.unmatched_usd,
                "ALERT: match rate below threshold"
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_run(&records, &summary);
        }

        info!(
            %run_id,
            total = summary.total_records,
            matched = summary.matched,
            anomalies = summary.anomalies,
            "Reconciliation complete"
        );

        Ok(ReconciliationReport {
            run_id,
            generated_at: Utc::now(),
            records,
            summary,
            breakdown,
            anomalies_csv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::QuotingMode;
    use crate::filter::RecordFilter;
    use crate::types::ReconciliationStatus;
    use chrono::{DateTime, Duration};
    use rust_decimal::Decimal;

    fn db(hash: &str, chain: &str, amount: i64, ts: DateTime<Utc>) -> DbRecord {
        DbRecord {
            tx_hash: hash.to_string(),
            amount: Decimal::from(amount),
            status: "completed".to_string(),
            chain: chain.to_string(),
            token: "USDC".to_string(),
            timestamp: ts,
            from_address: String::new(),
            to_address: String::new(),
        }
    }

    fn onchain(hash: &str, amount: i64, ts: DateTime<Utc>) -> OnchainRecord {
        OnchainRecord {
            tx_hash: hash.to_string(),
            amount: Decimal::from(amount),
            block_number: 42,
            timestamp: ts,
        }
    }

    #[test]
    fn test_run_flags_duplicates_by_default() {
        let now = Utc::now();
        let reconciler = Reconciler::new(ReconcilerConfig::default()).unwrap();
        let report = reconciler
            .run(
                &[db("0xaaa", "ethereum", 10, now), db("0xaaa", "ethereum", 10, now)],
                &[onchain("0xaaa", 10, now)],
            )
            .unwrap();

        assert_eq!(report.records.len(), 2);
        assert!(report
            .records
            .iter()
            .all(|r| r.status == ReconciliationStatus::Duplicate));
        assert_eq!(report.summary.anomalies, 2);
        assert_eq!(report.anomalies_csv.lines().count(), 3);
    }

    #[test]
    fn test_run_without_duplicate_detection() {
        let now = Utc::now();
        let config = ReconcilerConfig {
            detect_duplicates: false,
            ..ReconcilerConfig::default()
        };
        let report = Reconciler::new(config)
            .unwrap()
            .run(
                &[db("0xaaa", "ethereum", 10, now), db("0xaaa", "ethereum", 10, now)],
                &[onchain("0xaaa", 10, now)],
            )
            .unwrap();

        assert_eq!(report.summary.matched, 2);
        assert_eq!(report.anomalies_csv, "");
    }

    #[test]
    fn test_run_applies_filter() {
        let now = Utc::now();
        let config = ReconcilerConfig {
            filter: RecordFilter::all()
                .with_chain("solana")
                .with_window(now - Duration::hours(1), now + Duration::hours(1)),
            quoting: QuotingMode::AllFields,
            ..ReconcilerConfig::default()
        };
        let report = Reconciler::new(config)
            .unwrap()
            .run(
                &[
                    db("0xsol", "solana", 5, now),
                    db("0xeth", "ethereum", 5, now),
                ],
                &[
                    onchain("0xsol", 5, now),
                    onchain("0xold", 7, now - Duration::days(2)),
                ],
            )
            .unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].tx_hash, "0xsol");
        assert_eq!(report.summary.match_rate, 100.0);
        assert_eq!(report.breakdown.len(), 1);
        assert_eq!(report.breakdown[0].chain, "solana");
    }

    #[test]
    fn test_run_records_metrics() {
        let now = Utc::now();
        let metrics = Metrics::new().unwrap();
        let reconciler = Reconciler::new(ReconcilerConfig::default())
            .unwrap()
            .with_metrics(metrics);

        reconciler.run(&[], &[onchain("0xeee", 2000, now)]).unwrap();
        reconciler.run(&[], &[]).unwrap();

        let metrics = reconciler.metrics().unwrap();
        assert_eq!(metrics.runs_total.get(), 2);
        assert_eq!(metrics.records_for(ReconciliationStatus::MissingDb), 1);
    }

    #[test]
    fn test_rejects_inverted_window() {
        let now = Utc::now();
        let config = ReconcilerConfig {
            filter: RecordFilter::all().with_window(now, now - Duration::hours(1)),
            ..ReconcilerConfig::default()
        };
        assert!(Reconciler::new(config).is_err());
    }
}
