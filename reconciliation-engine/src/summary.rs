//! Summary aggregation

use crate::types::{ChainBreakdown, ReconciliationRecord, ReconciliationSummary};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Compute match rate and USD totals over a result set
///
/// `match_rate` is 0 for an empty set. Anomalies contribute the larger of
/// their two amounts to `unmatched_usd`. Totals saturate at `Decimal::MAX`.
pub fn calculate_summary(records: &[ReconciliationRecord]) -> ReconciliationSummary {
    aggregate(records)
}

fn aggregate<'a, I>(records: I) -> ReconciliationSummary
where
    I: IntoIterator<Item = &'a ReconciliationRecord>,
{
    let mut summary = ReconciliationSummary::default();

    for record in records {
        summary.total_records += 1;
        if record.status.is_anomaly() {
            summary.anomalies += 1;
            summary.unmatched_usd = summary.unmatched_usd.saturating_add(record.at_risk_amount());
        } else {
            summary.matched += 1;
            summary.total_verified_usd =
                summary.total_verified_usd.saturating_add(record.db_amount);
        }
    }

    summary.match_rate = match_rate(summary.matched, summary.total_records);
    summary
}

/// Summaries grouped by chain and token, in first-seen order
pub fn summarize_by_chain(records: &[ReconciliationRecord]) -> Vec<ChainBreakdown> {
    let mut keys: Vec<(&str, &str)> = Vec::new();
    for record in records {
        let key = (record.chain.as_str(), record.token.as_str());
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    keys.into_iter()
        .map(|(chain, token)| ChainBreakdown {
            chain: chain.to_string(),
            token: token.to_string(),
            summary: aggregate(
                records
                    .iter()
                    .filter(|r| r.chain == chain && r.token == token),
            ),
        })
        .collect()
}

fn match_rate(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let rate = Decimal::from(matched) * Decimal::ONE_HUNDRED / Decimal::from(total);
    rate.round_dp(2).to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReconciliationStatus;
    use chrono::Utc;

    fn record(
        chain: &str,
        status: ReconciliationStatus,
        db_amount: i64,
        onchain_amount: i64,
    ) -> ReconciliationRecord {
        ReconciliationRecord {
            id: "recon_0".to_string(),
            tx_hash: "0x1".to_string(),
            db_amount: Decimal::from(db_amount),
            onchain_amount: Decimal::from(onchain_amount),
            status,
            chain: chain.to_string(),
            token: "USDC".to_string(),
            timestamp: Utc::now(),
            from_address: String::new(),
            to_address: String::new(),
            details: None,
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = calculate_summary(&[]);
        assert_eq!(summary, ReconciliationSummary::default());
        assert_eq!(summary.match_rate, 0.0);
    }

    #[test]
    fn test_totals() {
        let records = vec![
            record("ethereum", ReconciliationStatus::Matched, 1000, 1000),
            record("ethereum", ReconciliationStatus::Mismatch, 1000, 950),
            record("ethereum", ReconciliationStatus::MissingOnchain, 300, 0),
            record("unknown", ReconciliationStatus::MissingDb, 0, 2000),
        ];
        let summary = calculate_summary(&records);

        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.anomalies, 3);
        assert_eq!(summary.match_rate, 25.0);
        assert_eq!(summary.total_verified_usd, Decimal::from(1000));
        assert_eq!(summary.unmatched_usd, Decimal::from(3300));
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let mut huge = record("ethereum", ReconciliationStatus::MissingOnchain, 0, 0);
        huge.db_amount = Decimal::MAX;
        let mut verified = record("ethereum", ReconciliationStatus::Matched, 0, 0);
        verified.db_amount = Decimal::MAX;
        let records = vec![huge.clone(), huge, verified.clone(), verified];

        let summary = calculate_summary(&records);
        assert_eq!(summary.unmatched_usd, Decimal::MAX);
        assert_eq!(summary.total_verified_usd, Decimal::MAX);
        assert_eq!(summary.match_rate, 50.0);

        let breakdown = summarize_by_chain(&records);
        assert_eq!(breakdown[0].summary.unmatched_usd, Decimal::MAX);
    }

    #[test]
    fn test_match_rate_rounding() {
        let records = vec![
            record("base", ReconciliationStatus::Matched, 1, 1),
            record("base", ReconciliationStatus::Duplicate, 1, 1),
            record("base", ReconciliationStatus::Matched, 1, 1),
        ];
        assert_eq!(calculate_summary(&records).match_rate, 66.67);
    }

    #[test]
    fn test_breakdown_by_chain() {
        let records = vec![
            record("ethereum", ReconciliationStatus::Matched, 10, 10),
            record("solana", ReconciliationStatus::MissingOnchain, 5, 0),
            record("ethereum", ReconciliationStatus::Mismatch, 10, 8),
        ];
        let breakdown = summarize_by_chain(&records);

        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].chain, "ethereum");
        assert_eq!(breakdown[0].summary.total_records, 2);
        assert_eq!(breakdown[0].summary.match_rate, 50.0);
        assert_eq!(breakdown[1].chain, "solana");
        assert_eq!(breakdown[1].summary.unmatched_usd, Decimal::from(5));
    }
}
