//! Transaction matcher
//!
//! Pairs DB records with on-chain records by transaction hash.
//!
//! # Algorithm
//!
//! 1. Index on-chain records by hash (last occurrence wins)
//! 2. Classify every DB record in input order:
//!    - no counterpart: `missing_onchain`
//!    - `|db - onchain| > db * 0.0001`: `mismatch`
//!    - otherwise: `matched`
//! 3. Emit `missing_db` for each on-chain hash no DB record claimed
//! 4. Number the output by position
//!
//! # Example
//!
//! ```text
//! DB:       0xaaa $1000    0xbbb $500
//! On-chain: 0xaaa $950     0xccc $20
//!
//! recon_0  0xaaa  mismatch         (diff $50.00 > tolerance $0.10)
//! recon_1  0xbbb  missing_onchain
//! recon_2  0xccc  missing_db
//! ```

use crate::types::*;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{HashMap, HashSet};

/// Details for a DB record with no on-chain counterpart
pub const MISSING_ONCHAIN_DETAILS: &str = "Transaction exists in database but not found on-chain";

/// Details for an on-chain record with no DB counterpart
pub const MISSING_DB_DETAILS: &str = "Transaction found on-chain but missing from database";

/// Record before its positional id is known
struct Classified {
    tx_hash: String,
    db_amount: Decimal,
    onchain_amount: Decimal,
    status: ReconciliationStatus,
    chain: String,
    token: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    from_address: String,
    to_address: String,
    details: Option<String>,
}

impl Classified {
    fn into_record(self, position: usize) -> ReconciliationRecord {
        ReconciliationRecord {
            id: format!("recon_{}", position),
            tx_hash: self.tx_hash,
            db_amount: self.db_amount,
            onchain_amount: self.onchain_amount,
            status: self.status,
            chain: self.chain,
            token: self.token,
            timestamp: self.timestamp,
            from_address: self.from_address,
            to_address: self.to_address,
            details: self.details,
        }
    }
}

/// Reconcile DB records against on-chain records
///
/// Produces one record per DB record, followed by one record per on-chain
/// transaction hash that no DB record references. Never fails.
pub fn reconcile(
    db_records: &[DbRecord],
    onchain_records: &[OnchainRecord],
) -> Vec<ReconciliationRecord> {
    let onchain_by_hash: HashMap<&str, &OnchainRecord> = onchain_records
        .iter()
        .map(|r| (r.tx_hash.as_str(), r))
        .collect();

    let mut claimed: HashSet<&str> = HashSet::new();
    let mut classified = Vec::with_capacity(db_records.len() + onchain_records.len());

    for db in db_records {
        let onchain = onchain_by_hash.get(db.tx_hash.as_str()).copied();
        if let Some(onchain) = onchain {
            claimed.insert(onchain.tx_hash.as_str());
        }
        classified.push(classify_db_record(db, onchain));
    }

    let mut emitted: HashSet<&str> = HashSet::new();
    for r in onchain_records {
        let hash = r.tx_hash.as_str();
        if claimed.contains(hash) || !emitted.insert(hash) {
            continue;
        }
        // Repeated hashes resolve to the indexed (last) observation
        let onchain = onchain_by_hash.get(hash).copied().unwrap_or(r);
        classified.push(missing_db(onchain));
    }

    tracing::debug!(
        db_records = db_records.len(),
        onchain_records = onchain_records.len(),
        output = classified.len(),
        "reconciled transaction sets"
    );

    classified
        .into_iter()
        .enumerate()
        .map(|(position, c)| c.into_record(position))
        .collect()
}

/// Tolerance allowed for a DB amount
pub fn tolerance_for(db_amount: Decimal) -> Decimal {
    db_amount * AMOUNT_TOLERANCE
}

/// Whether an on-chain amount agrees with a DB amount
///
/// Equality at the tolerance boundary still matches.
pub fn amounts_match(db_amount: Decimal, onchain_amount: Decimal) -> bool {
    (db_amount - onchain_amount).abs() <= tolerance_for(db_amount)
}

fn classify_db_record(db: &DbRecord, onchain: Option<&OnchainRecord>) -> Classified {
    let (onchain_amount, status, details) = match onchain {
        None => (
            Decimal::ZERO,
            ReconciliationStatus::MissingOnchain,
            Some(MISSING_ONCHAIN_DETAILS.to_string()),
        ),
        Some(onchain) if amounts_match(db.amount, onchain.amount) => {
            (onchain.amount, ReconciliationStatus::Matched, None)
        }
        Some(onchain) => {
            let diff = (db.amount - onchain.amount).abs();
            let details = format!(
                "Amount mismatch: DB=${} vs On-chain=${} (diff: ${})",
                usd(db.amount),
                usd(onchain.amount),
                usd(diff)
            );
            (onchain.amount, ReconciliationStatus::Mismatch, Some(details))
        }
    };

    Classified {
        tx_hash: db.tx_hash.clone(),
        db_amount: db.amount,
        onchain_amount,
        status,
        chain: db.chain.clone(),
        token: db.token.clone(),
        timestamp: db.timestamp,
        from_address: db.from_address.clone(),
        to_address: db.to_address.clone(),
        details,
    }
}

fn missing_db(onchain: &OnchainRecord) -> Classified {
    Classified {
        tx_hash: onchain.tx_hash.clone(),
        db_amount: Decimal::ZERO,
        onchain_amount: onchain.amount,
        status: ReconciliationStatus::MissingDb,
        chain: UNKNOWN.to_string(),
        token: UNKNOWN.to_string(),
        timestamp: onchain.timestamp,
        from_address: UNKNOWN.to_string(),
        to_address: UNKNOWN.to_string(),
        details: Some(MISSING_DB_DETAILS.to_string()),
    }
}

/// Format an amount with exactly two decimals, half away from zero
pub fn usd(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}
