//! Reconciliation Engine
//!
//! Cross-checks internally recorded payments against transactions observed
//! on-chain and produces audit-ready results.
//!
//! # Pipeline
//!
//! 1. **Validation**: raw collaborator records become [`DbRecord`] / [`OnchainRecord`]
//! 2. **Matching**: pair records by transaction hash and classify each pair
//! 3. **Duplicate detection**: flag transaction hashes seen more than once
//! 4. **Reporting**: summary totals, per-chain breakdown and anomaly CSV
//!
//! The matching, duplicate, summary and export steps are total functions over
//! validated input. Only validation, configuration and file IO can fail.
//!
//! # Example
//!
//! ```
//! use reconciliation_engine::{calculate_summary, reconcile, ReconciliationStatus};
//! use reconciliation_engine::{DbRecord, OnchainRecord};
//! use rust_decimal::Decimal;
//!
//! let now = chrono::Utc::now();
//! let db = vec![DbRecord {
//!     tx_hash: "0xaaa".to_string(),
//!     amount: Decimal::from(1000),
//!     status: "completed".to_string(),
//!     chain: "ethereum".to_string(),
//!     token: "USDC".to_string(),
//!     timestamp: now,
//!     from_address: String::new(),
//!     to_address: String::new(),
//! }];
//! let onchain = vec![OnchainRecord {
//!     tx_hash: "0xaaa".to_string(),
//!     amount: Decimal::from(1000),
//!     block_number: 19_000_000,
//!     timestamp: now,
//! }];
//!
//! let records = reconcile(&db, &onchain);
//! assert_eq!(records[0].status, ReconciliationStatus::Matched);
//! assert_eq!(calculate_summary(&records).match_rate, 100.0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod duplicates;
pub mod error;
pub mod export;
pub mod filter;
pub mod io;
pub mod matcher;
pub mod metrics;
pub mod pipeline;
pub mod summary;
pub mod types;
pub mod validation;

// Re-exports
pub use config::{Config, ReconcilerConfig};
pub use duplicates::detect_duplicates;
pub use error::{Error, Result, ValidationError};
pub use export::{export_anomalies_csv, AnomalyExporter, QuotingMode};
pub use filter::RecordFilter;
pub use matcher::reconcile;
pub use metrics::Metrics;
pub use pipeline::Reconciler;
pub use summary::{calculate_summary, summarize_by_chain};
pub use types::*;
