//! Duplicate transaction hash detection
//!
//! Retried submissions and indexer re-emission can put the same hash into a
//! result set more than once. Such records are flagged, never removed.

use crate::types::{ReconciliationRecord, ReconciliationStatus};
use std::collections::HashMap;

/// Details attached to every flagged record
pub const DUPLICATE_DETAILS: &str = "Duplicate transaction hash detected";

/// Flag every record whose transaction hash occurs more than once
///
/// The flag overrides whatever status the record had before, `mismatch`
/// included. Records with a unique hash are returned unchanged.
pub fn detect_duplicates(records: &[ReconciliationRecord]) -> Vec<ReconciliationRecord> {
    let mut occurrences: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    for record in records {
        *occurrences.entry(record.tx_hash.as_str()).or_insert(0) += 1;
    }

    let flagged = records
        .iter()
        .map(|record| {
            let count = occurrences.get(record.tx_hash.as_str()).copied().unwrap_or(0);
            if count > 1 {
                ReconciliationRecord {
                    status: ReconciliationStatus::Duplicate,
                    details: Some(DUPLICATE_DETAILS.to_string()),
                    ..record.clone()
                }
            } else {
                record.clone()
            }
        })
        .collect::<Vec<_>>();

    let duplicates = flagged
        .iter()
        .filter(|r| r.status == ReconciliationStatus::Duplicate)
        .count();
    if duplicates > 0 {
        tracing::debug!(duplicates, "flagged duplicate transaction hashes");
    }

    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn record(id: &str, hash: &str, status: ReconciliationStatus) -> ReconciliationRecord {
        ReconciliationRecord {
            id: id.to_string(),
            tx_hash: hash.to_string(),
            db_amount: Decimal::from(100),
            onchain_amount: Decimal::from(90),
            status,
            chain: "polygon".to_string(),
            token: "USDT".to_string(),
            timestamp: Utc::now(),
            from_address: "0xa".to_string(),
            to_address: "0xb".to_string(),
            details: None,
        }
    }

    #[test]
    fn test_unique_hashes_untouched() {
        let input = vec![
            record("recon_0", "0x1", ReconciliationStatus::Matched),
            record("recon_1", "0x2", ReconciliationStatus::Mismatch),
        ];
        assert_eq!(detect_duplicates(&input), input);
    }

    #[test]
    fn test_duplicate_overrides_mismatch() {
        let input = vec![
            record("recon_0", "0x1", ReconciliationStatus::Mismatch),
            record("recon_1", "0x2", ReconciliationStatus::Matched),
            record("recon_2", "0x1", ReconciliationStatus::MissingDb),
        ];
        let output = detect_duplicates(&input);

        assert_eq!(output[0].status, ReconciliationStatus::Duplicate);
        assert_eq!(output[0].details.as_deref(), Some(DUPLICATE_DETAILS));
        assert_eq!(output[1], input[1]);
        assert_eq!(output[2].status, ReconciliationStatus::Duplicate);

        // ids and amounts survive the flag
        assert_eq!(output[2].id, "recon_2");
        assert_eq!(output[2].db_amount, Decimal::from(100));

        // input is left alone
        assert_eq!(input[0].status, ReconciliationStatus::Mismatch);
    }
}
