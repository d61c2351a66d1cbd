//! File IO for the report binary

use crate::metrics::Metrics;
use crate::types::{DbRecord, OnchainRecord, ReconciliationReport};
use crate::validation::{
    validate_db_records, validate_onchain_records, RawDbRecord, RawOnchainRecord,
};
use crate::Result;
use std::path::{Path, PathBuf};

/// Summary file name
pub const SUMMARY_FILE: &str = "summary.json";
/// Records file name
pub const RECORDS_FILE: &str = "records.json";
/// Anomaly export file name
pub const ANOMALIES_FILE: &str = "anomalies.csv";
/// Metrics file name
pub const METRICS_FILE: &str = "metrics.prom";

/// Read and validate a JSON array of payment records
pub fn load_db_records(path: impl AsRef<Path>) -> Result<Vec<DbRecord>> {
    let content = std::fs::read_to_string(path)?;
    let raw: Vec<RawDbRecord> = serde_json::from_str(&content)?;
    Ok(validate_db_records(&raw)?)
}

/// Read and validate a JSON array of on-chain observations
pub fn load_onchain_records(path: impl AsRef<Path>) -> Result<Vec<OnchainRecord>> {
    let content = std::fs::read_to_string(path)?;
    let raw: Vec<RawOnchainRecord> = serde_json::from_str(&content)?;
    Ok(validate_onchain_records(&raw)?)
}

/// Write a report into `dir`, returning the files written
///
/// The anomaly file is skipped when there is nothing to export.
pub fn write_report(
    report: &ReconciliationReport,
    metrics: Option<&Metrics>,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let summary = serde_json::json!({
        "run_id": report.run_id,
        "generated_at": report.generated_at,
        "summary": report.summary,
        "breakdown": report.breakdown,
    });
    let summary_json = serde_json::to_string_pretty(&summary)?;
    written.push(write_file(dir, SUMMARY_FILE, &summary_json)?);

    let records_json = serde_json::to_string_pretty(&report.records)?;
    written.push(write_file(dir, RECORDS_FILE, &records_json)?);

    if !report.anomalies_csv.is_empty() {
        written.push(write_file(dir, ANOMALIES_FILE, &report.anomalies_csv)?);
    }

    if let Some(metrics) = metrics {
        written.push(write_file(dir, METRICS_FILE, &metrics.render()?)?);
    }

    Ok(written)
}

fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote report file");
    Ok(path)
}
