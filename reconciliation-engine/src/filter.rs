//! Pre-match narrowing of the input streams
//!
//! Mirrors the window/chain filter the payments store applies upstream, so a
//! run over a wider export can be scoped without re-querying.

use crate::types::{DbRecord, OnchainRecord};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chain and time window filter
///
/// Time bounds are inclusive. On-chain records carry no chain, so the chain
/// constraint applies to DB records only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Chain name (case-insensitive)
    #[serde(default)]
    pub chain: Option<String>,

    /// Earliest timestamp kept
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,

    /// Latest timestamp kept
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl RecordFilter {
    /// Filter passing everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one chain
    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = Some(chain.into());
        self
    }

    /// Restrict to a time window
    pub fn with_window(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Reject an inverted window
    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(Error::Config(format!(
                    "filter window start {} is after end {}",
                    from, to
                )));
            }
        }
        Ok(())
    }

    /// Whether no constraint is set
    pub fn is_empty(&self) -> bool {
        self.chain.is_none() && self.from.is_none() && self.to.is_none()
    }

    /// DB records inside the filter, in input order
    pub fn apply_db(&self, records: &[DbRecord]) -> Vec<DbRecord> {
        records
            .iter()
            .filter(|r| self.chain_matches(&r.chain) && self.in_window(r.timestamp))
            .cloned()
            .collect()
    }

    /// On-chain records inside the time window, in input order
    pub fn apply_onchain(&self, records: &[OnchainRecord]) -> Vec<OnchainRecord> {
        records
            .iter()
            .filter(|r| self.in_window(r.timestamp))
            .cloned()
            .collect()
    }

    fn chain_matches(&self, chain: &str) -> bool {
        self.chain
            .as_deref()
            .map_or(true, |wanted| wanted.eq_ignore_ascii_case(chain))
    }

    fn in_window(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn db(chain: &str, ts: DateTime<Utc>) -> DbRecord {
        DbRecord {
            tx_hash: format!("0x{}", chain),
            amount: Decimal::ONE,
            status: "completed".to_string(),
            chain: chain.to_string(),
            token: "USDC".to_string(),
            timestamp: ts,
            from_address: String::new(),
            to_address: String::new(),
        }
    }

    fn onchain(ts: DateTime<Utc>) -> OnchainRecord {
        OnchainRecord {
            tx_hash: "0x1".to_string(),
            amount: Decimal::ONE,
            block_number: 1,
            timestamp: ts,
        }
    }

    #[test]
    fn test_empty_filter_passes_everything() {
        let now = Utc::now();
        let records = vec![db("ethereum", now), db("solana", now)];
        assert!(RecordFilter::all().is_empty());
        assert_eq!(RecordFilter::all().apply_db(&records), records);
    }

    #[test]
    fn test_chain_is_case_insensitive() {
        let now = Utc::now();
        let records = vec![db("Ethereum", now), db("solana", now)];
        let kept = RecordFilter::all().with_chain("ETHEREUM").apply_db(&records);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].chain, "Ethereum");
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(1);
        let filter = RecordFilter::all().with_window(start, end);

        let records = vec![
            onchain(start - Duration::seconds(1)),
            onchain(start),
            onchain(end),
            onchain(end + Duration::seconds(1)),
        ];
        assert_eq!(filter.apply_onchain(&records).len(), 2);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let now = Utc::now();
        let filter = RecordFilter::all().with_window(now, now - Duration::hours(1));
        assert!(matches!(filter.validate(), Err(Error::Config(_))));
        assert!(RecordFilter::all().validate().is_ok());
    }
}
