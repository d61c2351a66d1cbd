//! Input validation
//!
//! Collaborators hand over records as loosely typed JSON. This module is the
//! single parse step between those shapes and the validated [`DbRecord`] /
//! [`OnchainRecord`] types, so everything downstream can stay total.

use crate::error::ValidationError;
use crate::types::{DbRecord, OnchainRecord};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Largest accepted amount (1 billion)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Cyrillic characters that render like Latin letters in most fonts
const CYRILLIC_HOMOGLYPHS: [char; 17] = [
    'а', 'е', 'о', 'р', 'с', 'х', 'А', 'В', 'Е', 'К', 'М', 'Н', 'О', 'Р', 'С', 'Т', 'Х',
];

/// `0x` followed by 40 hex characters
static EVM_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("Invalid EVM address regex"));

/// Base58, 32-44 characters
static SOLANA_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("Invalid Solana address regex")
});

/// Legacy P2PKH/P2SH
static BTC_LEGACY_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[13][a-km-zA-HJ-NP-Z1-9]{25,34}$").expect("Invalid legacy BTC regex")
});

/// Bech32 segwit
static BTC_SEGWIT_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^bc1[a-zA-HJ-NP-Z0-9]{25,89}$").expect("Invalid segwit BTC regex")
});

/// Bech32m taproot
static BTC_TAPROOT_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^bc1p[a-zA-HJ-NP-Z0-9]{58}$").expect("Invalid taproot BTC regex")
});

/// Amount as supplied by a collaborator: decimal string or JSON number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// `"1000.50"`
    Text(String),
    /// `1000.5`
    Number(serde_json::Number),
}

impl AmountInput {
    fn raw(&self) -> String {
        match self {
            AmountInput::Text(s) => s.clone(),
            AmountInput::Number(n) => n.to_string(),
        }
    }
}

/// Unvalidated payment record from the payments store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDbRecord {
    /// Transaction hash
    pub tx_hash: String,
    /// Amount
    pub amount: AmountInput,
    /// Store status
    #[serde(default)]
    pub status: String,
    /// Chain name
    pub chain: String,
    /// Token symbol
    pub token: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Sender address
    #[serde(default)]
    pub from_address: String,
    /// Recipient address
    #[serde(default)]
    pub to_address: String,
}

/// Unvalidated observation from a blockchain indexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOnchainRecord {
    /// Transaction hash
    pub tx_hash: String,
    /// Amount
    pub amount: AmountInput,
    /// Block number
    pub block_number: u64,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl RawDbRecord {
    /// Validate into a [`DbRecord`]
    pub fn validate(&self) -> Result<DbRecord, ValidationError> {
        let tx_hash = parse_tx_hash(&self.tx_hash)?;
        let amount = parse_amount(&self.amount)?;
        let chain = require("chain", &self.chain)?;
        let token = require("token", &self.token)?;
        let timestamp = parse_timestamp(&self.timestamp)?;
        let from_address = check_address("from_address", &self.from_address, &chain)?;
        let to_address = check_address("to_address", &self.to_address, &chain)?;

        Ok(DbRecord {
            tx_hash,
            amount,
            status: self.status.trim().to_string(),
            chain,
            token,
            timestamp,
            from_address,
            to_address,
        })
    }
}

impl RawOnchainRecord {
    /// Validate into an [`OnchainRecord`]
    pub fn validate(&self) -> Result<OnchainRecord, ValidationError> {
        Ok(OnchainRecord {
            tx_hash: parse_tx_hash(&self.tx_hash)?,
            amount: parse_amount(&self.amount)?,
            block_number: self.block_number,
            timestamp: parse_timestamp(&self.timestamp)?,
        })
    }
}

/// Validate a batch of DB records, failing on the first bad one
pub fn validate_db_records(raw: &[RawDbRecord]) -> Result<Vec<DbRecord>, ValidationError> {
    raw.iter()
        .enumerate()
        .map(|(index, r)| r.validate().map_err(|e| at_index(index, e)))
        .collect()
}

/// Validate a batch of on-chain records, failing on the first bad one
pub fn validate_onchain_records(
    raw: &[RawOnchainRecord],
) -> Result<Vec<OnchainRecord>, ValidationError> {
    raw.iter()
        .enumerate()
        .map(|(index, r)| r.validate().map_err(|e| at_index(index, e)))
        .collect()
}

fn at_index(index: usize, source: ValidationError) -> ValidationError {
    ValidationError::AtIndex {
        index,
        source: Box::new(source),
    }
}

fn require(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    Ok(trimmed.to_string())
}

fn parse_tx_hash(value: &str) -> Result<String, ValidationError> {
    require("tx_hash", value)
}

fn parse_amount(input: &AmountInput) -> Result<Decimal, ValidationError> {
    let raw = input.raw();
    let text = raw.trim();
    let amount = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| ValidationError::InvalidAmount { value: raw.clone() })?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::NegativeAmount { value: raw });
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge { value: raw });
    }
    Ok(amount)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidTimestamp {
            value: value.to_string(),
        })
}

fn check_address(
    field: &'static str,
    value: &str,
    chain: &str,
) -> Result<String, ValidationError> {
    if let Some((position, character)) = find_homoglyph(value) {
        return Err(ValidationError::Homoglyph {
            field,
            character,
            position,
        });
    }

    let address = value.trim();
    if !address.is_empty() && !is_valid_address_for_chain(address, chain) {
        return Err(ValidationError::InvalidAddress {
            field,
            chain: chain.to_string(),
        });
    }
    Ok(address.to_string())
}

/// Whether `address` has the format used on `chain`
///
/// `solana` and `bitcoin` have their own formats; every other chain is
/// treated as EVM-compatible.
pub fn is_valid_address_for_chain(address: &str, chain: &str) -> bool {
    match chain.trim().to_ascii_lowercase().as_str() {
        "solana" => SOLANA_ADDRESS.is_match(address),
        "bitcoin" => {
            BTC_LEGACY_ADDRESS.is_match(address)
                || BTC_SEGWIT_ADDRESS.is_match(address)
                || BTC_TAPROOT_ADDRESS.is_match(address)
        }
        _ => EVM_ADDRESS.is_match(address),
    }
}

/// First Cyrillic look-alike in `address`, with its byte offset
pub fn find_homoglyph(address: &str) -> Option<(usize, char)> {
    address
        .char_indices()
        .find(|(_, c)| CYRILLIC_HOMOGLYPHS.contains(c))
}
