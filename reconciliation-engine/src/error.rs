//! Error types for the reconciliation engine

use thiserror::Error;

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciliation errors
///
/// Matching, duplicate detection, summaries and export never fail; these
/// variants cover the boundary around them.
#[derive(Error, Debug)]
pub enum Error {
    /// Input record rejected during validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A caller-supplied record that does not satisfy the input contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field missing or blank
    #[error("{field} is required")]
    Missing {
        /// Field name
        field: &'static str,
    },

    /// Amount is not a decimal number
    #[error("invalid amount {value:?}")]
    InvalidAmount {
        /// Raw value
        value: String,
    },

    /// Amount below zero
    #[error("amount must not be negative, got {value}")]
    NegativeAmount {
        /// Raw value
        value: String,
    },

    /// Amount above the accepted maximum
    #[error("amount exceeds maximum of 1 billion, got {value}")]
    AmountTooLarge {
        /// Raw value
        value: String,
    },

    /// Timestamp is not RFC 3339
    #[error("invalid timestamp {value:?}")]
    InvalidTimestamp {
        /// Raw value
        value: String,
    },

    /// Address contains a Cyrillic look-alike of a Latin letter
    #[error("{field} contains suspicious character {character:?} at position {position}")]
    Homoglyph {
        /// Field name
        field: &'static str,
        /// Offending character
        character: char,
        /// Byte offset in the address
        position: usize,
    },

    /// Address does not have the format of its chain
    #[error("{field} is not a valid {chain} address")]
    InvalidAddress {
        /// Field name
        field: &'static str,
        /// Chain the address was checked against
        chain: String,
    },

    /// Failure inside a batch, tagged with the record index
    #[error("record {index}: {source}")]
    AtIndex {
        /// Position in the input slice
        index: usize,
        /// Underlying failure
        #[source]
        source: Box<ValidationError>,
    },
}
