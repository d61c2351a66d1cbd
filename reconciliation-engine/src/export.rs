//! Anomaly CSV export
//!
//! One row per record whose status is not `matched`, in input order:
//!
//! ```text
//! TX Hash,Status,DB Amount,On-chain Amount,Chain,Token,Timestamp,Details
//! 0xbbb,mismatch,1000.00,950.00,ethereum,USDC,2024-03-01T12:00:00.000Z,"Amount mismatch: ..."
//! ```
//!
//! Timestamps are written in UTC with millisecond precision.
//!
//! An empty string means there is nothing to export; a header-only file is
//! never produced.

use crate::matcher::usd;
use crate::types::ReconciliationRecord;
use crate::Result;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// Column header of the anomaly report
pub const CSV_HEADER: [&str; 8] = [
    "TX Hash",
    "Status",
    "DB Amount",
    "On-chain Amount",
    "Chain",
    "Token",
    "Timestamp",
    "Details",
];

/// Which fields get quoted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotingMode {
    /// Only `Details` is quoted; matches what existing spreadsheet imports expect
    #[default]
    DetailsOnly,
    /// Every field quoted; safe when chain or token values may contain commas
    AllFields,
}

/// Anomaly exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyExporter {
    quoting: QuotingMode,
}

impl AnomalyExporter {
    /// Create new exporter
    pub fn new(quoting: QuotingMode) -> Self {
        Self { quoting }
    }

    /// Quoting mode in use
    pub fn quoting(&self) -> QuotingMode {
        self.quoting
    }

    /// Render anomalies as CSV text
    pub fn export(&self, records: &[ReconciliationRecord]) -> Result<String> {
        let rows = anomaly_rows(records);
        if rows.is_empty() {
            return Ok(String::new());
        }

        match self.quoting {
            QuotingMode::DetailsOnly => Ok(render_details_only(&rows)),
            QuotingMode::AllFields => render_all_fields(&rows),
        }
    }
}

/// Render anomalies with only the `Details` column quoted
pub fn export_anomalies_csv(records: &[ReconciliationRecord]) -> String {
    let rows = anomaly_rows(records);
    if rows.is_empty() {
        return String::new();
    }
    render_details_only(&rows)
}

fn anomaly_rows(records: &[ReconciliationRecord]) -> Vec<[String; 8]> {
    records
        .iter()
        .filter(|r| r.status.is_anomaly())
        .map(row)
        .collect()
}

fn row(record: &ReconciliationRecord) -> [String; 8] {
    [
        record.tx_hash.clone(),
        record.status.to_string(),
        usd(record.db_amount),
        usd(record.onchain_amount),
        record.chain.clone(),
        record.token.clone(),
        record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        record.details.clone().unwrap_or_default(),
    ]
}

fn render_details_only(rows: &[[String; 8]]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADER.join(","));

    for fields in rows {
        lines.push(format!(
            "{},\"{}\"",
            fields[..7].join(","),
            fields[7].replace('"', "\"\"")
        ));
    }

    lines.join("\n")
}

fn render_all_fields(rows: &[[String; 8]]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for fields in rows {
        writer.write_record(fields)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| crate::Error::Io(e.into_error()))?;
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}
