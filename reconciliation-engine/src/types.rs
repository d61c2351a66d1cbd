//! Core types for the reconciliation engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Relative amount tolerance applied to the DB-side amount (0.01%)
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Placeholder for attributes an on-chain observation cannot supply
pub const UNKNOWN: &str = "unknown";

/// Payment recorded in the system's own ledger
///
/// Built from a [`RawDbRecord`](crate::validation::RawDbRecord) through
/// validation. `tx_hash` is not guaranteed to be unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbRecord {
    /// Transaction hash (join key)
    pub tx_hash: String,

    /// Payment amount in USD
    pub amount: Decimal,

    /// Payment status as recorded by the store
    pub status: String,

    /// Chain name
    pub chain: String,

    /// Token symbol
    pub token: String,

    /// Recorded timestamp
    pub timestamp: DateTime<Utc>,

    /// Sender address
    pub from_address: String,

    /// Recipient address
    pub to_address: String,
}

/// Transaction observed by a blockchain indexer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnchainRecord {
    /// Transaction hash (join key)
    pub tx_hash: String,

    /// Transferred amount in USD
    pub amount: Decimal,

    /// Block the transaction was included in
    pub block_number: u64,

    /// Block timestamp
    pub timestamp: DateTime<Utc>,
}

/// Reconciliation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    /// Both sides agree within tolerance
    Matched,
    /// Both sides present, amounts differ beyond tolerance
    Mismatch,
    /// Recorded in the database, not observed on-chain
    MissingOnchain,
    /// Observed on-chain, not recorded in the database
    MissingDb,
    /// Transaction hash appears more than once in the result set
    Duplicate,
    /// Reserved for collaborators that give up waiting for confirmation
    Timeout,
    /// Reserved for collaborators that cannot attribute the sender
    UnknownSender,
}

impl ReconciliationStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Matched => "matched",
            ReconciliationStatus::Mismatch => "mismatch",
            ReconciliationStatus::MissingOnchain => "missing_onchain",
            ReconciliationStatus::MissingDb => "missing_db",
            ReconciliationStatus::Duplicate => "duplicate",
            ReconciliationStatus::Timeout => "timeout",
            ReconciliationStatus::UnknownSender => "unknown_sender",
        }
    }

    /// Every status other than `matched` is an anomaly
    pub fn is_anomaly(&self) -> bool {
        !matches!(self, ReconciliationStatus::Matched)
    }

    /// All statuses, in declaration order
    pub const ALL: [ReconciliationStatus; 7] = [
        ReconciliationStatus::Matched,
        ReconciliationStatus::Mismatch,
        ReconciliationStatus::MissingOnchain,
        ReconciliationStatus::MissingDb,
        ReconciliationStatus::Duplicate,
        ReconciliationStatus::Timeout,
        ReconciliationStatus::UnknownSender,
    ];
}

impl std::fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of reconciling one DB record or one unmatched on-chain record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    /// Run-local id (`recon_0`, `recon_1`, ...)
    pub id: String,

    /// Transaction hash
    pub tx_hash: String,

    /// DB-side amount (zero for `missing_db`)
    pub db_amount: Decimal,

    /// On-chain amount (zero for `missing_onchain`)
    pub onchain_amount: Decimal,

    /// Classification
    pub status: ReconciliationStatus,

    /// Chain name
    pub chain: String,

    /// Token symbol
    pub token: String,

    /// Timestamp of the originating record
    pub timestamp: DateTime<Utc>,

    /// Sender address
    pub from_address: String,

    /// Recipient address
    pub to_address: String,

    /// Human-readable explanation for anomalies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ReconciliationRecord {
    /// The larger of the two sides, used as the at-risk value of an anomaly
    pub fn at_risk_amount(&self) -> Decimal {
        self.db_amount.max(self.onchain_amount)
    }
}

/// Aggregate view over a result set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    /// Number of records
    pub total_records: usize,

    /// Records with status `matched`
    pub matched: usize,

    /// Records with any other status
    pub anomalies: usize,

    /// Matched share in percent (0-100, two decimals)
    pub match_rate: f64,

    /// Sum of DB amounts over matched records
    pub total_verified_usd: Decimal,

    /// Sum of the larger side over anomalies
    pub unmatched_usd: Decimal,
}

/// Summary restricted to one chain/token pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainBreakdown {
    /// Chain name
    pub chain: String,

    /// Token symbol
    pub token: String,

    /// Aggregates for this pair
    pub summary: ReconciliationSummary,
}

/// Everything a reporting API needs from one run
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    /// Run identifier
    pub run_id: Uuid,

    /// Generation time
    pub generated_at: DateTime<Utc>,

    /// Classified records
    pub records: Vec<ReconciliationRecord>,

    /// Global summary
    pub summary: ReconciliationSummary,

    /// Per chain/token summaries
    pub breakdown: Vec<ChainBreakdown>,

    /// Anomaly export (empty when nothing to export)
    pub anomalies_csv: String,
}
