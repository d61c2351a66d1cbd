//! Configuration for the reconciliation engine
//!
//! The amount tolerance and CSV column order are fixed constants, not
//! configuration.

use crate::export::QuotingMode;
use crate::filter::RecordFilter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Report binary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// JSON array of payment records
    pub db_records_path: PathBuf,

    /// JSON array of on-chain observations
    pub onchain_records_path: PathBuf,

    /// Directory receiving the report files
    pub output_dir: PathBuf,

    /// Pipeline configuration
    pub reconciler: ReconcilerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "reconciliation-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            db_records_path: PathBuf::from("./data/reconciliation/db_records.json"),
            onchain_records_path: PathBuf::from("./data/reconciliation/onchain_records.json"),
            output_dir: PathBuf::from("./data/reconciliation/reports"),
            reconciler: ReconcilerConfig::default(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Flag repeated transaction hashes after matching
    pub detect_duplicates: bool,

    /// CSV quoting mode
    pub quoting: QuotingMode,

    /// Warn when the match rate (percent) drops below this value
    pub alert_match_rate: f64,

    /// Input filter
    pub filter: RecordFilter,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            detect_duplicates: true,
            quoting: QuotingMode::DetailsOnly,
            alert_match_rate: 95.0,
            filter: RecordFilter::default(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults, then apply environment overrides
    pub fn from_env() -> crate::Result<Self> {
        Config::default().with_env_overrides()
    }

    /// Apply `RECON_*` environment overrides on top of this configuration
    pub fn with_env_overrides(mut self) -> crate::Result<Self> {
        if let Ok(path) = std::env::var("RECON_DB_RECORDS") {
            self.db_records_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("RECON_ONCHAIN_RECORDS") {
            self.onchain_records_path = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("RECON_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }

        if let Ok(chain) = std::env::var("RECON_CHAIN") {
            self.reconciler.filter.chain = Some(chain);
        }

        if let Ok(quoting) = std::env::var("RECON_QUOTING") {
            self.reconciler.quoting = parse_quoting(&quoting)?;
        }

        if let Ok(flag) = std::env::var("RECON_DETECT_DUPLICATES") {
            self.reconciler.detect_duplicates = flag.parse().map_err(|_| {
                crate::Error::Config(format!(
                    "RECON_DETECT_DUPLICATES must be true or false, got {:?}",
                    flag
                ))
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=100.0).contains(&self.reconciler.alert_match_rate) {
            return Err(crate::Error::Config(format!(
                "alert_match_rate must be within 0-100, got {}",
                self.reconciler.alert_match_rate
            )));
        }
        self.reconciler.filter.validate()
    }
}

fn parse_quoting(value: &str) -> crate::Result<QuotingMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "details_only" => Ok(QuotingMode::DetailsOnly),
        "all_fields" => Ok(QuotingMode::AllFields),
        other => Err(crate::Error::Config(format!("unknown quoting mode {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            output_dir = "/tmp/recon"

            [reconciler]
            quoting = "all_fields"

            [reconciler.filter]
            chain = "polygon"
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/tmp/recon"));
        assert_eq!(config.reconciler.quoting, QuotingMode::AllFields);
        assert!(config.reconciler.detect_duplicates);
        assert_eq!(config.reconciler.filter.chain.as_deref(), Some("polygon"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recon.toml");
        std::fs::write(&path, "[reconciler]\nalert_match_rate = 80.0\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.reconciler.alert_match_rate, 80.0);
    }

    #[test]
    fn test_rejects_out_of_range_alert() {
        let mut config = Config::default();
        config.reconciler.alert_match_rate = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_quoting() {
        assert_eq!(parse_quoting("ALL_FIELDS").unwrap(), QuotingMode::AllFields);
        assert!(parse_quoting("sometimes").is_err());
    }
}
