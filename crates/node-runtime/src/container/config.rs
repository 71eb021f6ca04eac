//! # Indexer Configuration
//!
//! Unified configuration for the subsystems and the pipeline.
//!
//! Every field has a default and an `IDX_*` environment override:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `IDX_INDEXER_NAME` | `indexer_name` | `celestia_indexer` |
//! | `IDX_FEE_DENOM` | `fee_denom` | `utia` |
//! | `IDX_ADDRESS_PREFIX` | `address_prefix` | `celestia` |
//! | `IDX_DATA_DIR` | `data_dir` | unset (in-memory) |
//! | `IDX_SLASHING_DOUBLE_SIGN` | `slashing_double_sign` | `0.05` |
//! | `IDX_SLASHING_DOWNTIME` | `slashing_downtime` | `0` |
//! | `IDX_MAX_RETRIES` | `max_retries` | `3` |
//! | `IDX_RETRY_DELAY_MS` | `retry_delay_ms` | `500` |
//! | `IDX_CHANNEL_CAPACITY` | `channel_capacity` | `16` |
//! | `IDX_PARTITION_PERIOD` | `partition_period` | `monthly` |
//! | `IDX_INPUT` | `input` | unset |

use bigdecimal::{BigDecimal, Signed};
use idx_01_tx_decoding::DecoderConfig;
use idx_03_validator_lifecycle::SlashingConfig;
use idx_04_persistence::{CoordinatorConfig, PartitionPeriod};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// A required field is empty.
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    /// A slashing fraction is outside `[0, 1]`.
    #[error("{field} must be within [0, 1], got {value}")]
    FractionOutOfRange { field: &'static str, value: String },

    #[error("channel_capacity must be positive")]
    ZeroCapacity,
}

/// Complete indexer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexerConfig {
    /// Key of the state row.
    pub indexer_name: String,
    /// Native fee denomination.
    pub fee_denom: String,
    /// Bech32 prefix of account addresses.
    pub address_prefix: String,
    /// RocksDB directory; in-memory storage when unset.
    pub data_dir: Option<PathBuf>,
    pub slashing_double_sign: BigDecimal,
    pub slashing_downtime: BigDecimal,
    /// Attempts after the first for a block failing with a retryable error.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Buffer size of every pipeline channel.
    pub channel_capacity: usize,
    pub partition_period: PartitionPeriod,
    /// JSON lines file of block envelopes.
    pub input: Option<PathBuf>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        let slashing = SlashingConfig::default();
        Self {
            indexer_name: "celestia_indexer".to_string(),
            fee_denom: "utia".to_string(),
            address_prefix: "celestia".to_string(),
            data_dir: None,
            slashing_double_sign: slashing.double_sign,
            slashing_downtime: slashing.downtime,
            max_retries: 3,
            retry_delay_ms: 500,
            channel_capacity: 16,
            partition_period: PartitionPeriod::Monthly,
            input: None,
        }
    }
}

impl IndexerConfig {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by `lookup`, then validated.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("IDX_INDEXER_NAME") {
            config.indexer_name = name;
        }
        if let Some(denom) = lookup("IDX_FEE_DENOM") {
            config.fee_denom = denom;
        }
        if let Some(prefix) = lookup("IDX_ADDRESS_PREFIX") {
            config.address_prefix = prefix;
        }
        if let Some(dir) = lookup("IDX_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(input) = lookup("IDX_INPUT") {
            config.input = Some(PathBuf::from(input));
        }
        if let Some(value) = lookup("IDX_SLASHING_DOUBLE_SIGN") {
            config.slashing_double_sign = parse("IDX_SLASHING_DOUBLE_SIGN", &value)?;
        }
        if let Some(value) = lookup("IDX_SLASHING_DOWNTIME") {
            config.slashing_downtime = parse("IDX_SLASHING_DOWNTIME", &value)?;
        }
        if let Some(value) = lookup("IDX_MAX_RETRIES") {
            config.max_retries = parse("IDX_MAX_RETRIES", &value)?;
        }
        if let Some(value) = lookup("IDX_RETRY_DELAY_MS") {
            config.retry_delay_ms = parse("IDX_RETRY_DELAY_MS", &value)?;
        }
        if let Some(value) = lookup("IDX_CHANNEL_CAPACITY") {
            config.channel_capacity = parse("IDX_CHANNEL_CAPACITY", &value)?;
        }
        if let Some(value) = lookup("IDX_PARTITION_PERIOD") {
            config.partition_period = match value.to_ascii_lowercase().as_str() {
                "monthly" => PartitionPeriod::Monthly,
                "yearly" => PartitionPeriod::Yearly,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "IDX_PARTITION_PERIOD",
                        value,
                        reason: "expected monthly or yearly".to_string(),
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexer_name.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                field: "indexer_name",
            });
        }
        if self.fee_denom.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "fee_denom" });
        }
        if self.address_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                field: "address_prefix",
            });
        }
        check_fraction("slashing_double_sign", &self.slashing_double_sign)?;
        check_fraction("slashing_downtime", &self.slashing_downtime)?;
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    pub fn decoder(&self) -> DecoderConfig {
        DecoderConfig {
            fee_denom: self.fee_denom.clone(),
            address_prefix: self.address_prefix.clone(),
        }
    }

    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            indexer_name: self.indexer_name.clone(),
            partition_period: self.partition_period,
            slashing: SlashingConfig::new(
                self.slashing_double_sign.clone(),
                self.slashing_downtime.clone(),
            ),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn check_fraction(field: &'static str, value: &BigDecimal) -> Result<(), ConfigError> {
    if value.is_negative() || *value > BigDecimal::from(1) {
        return Err(ConfigError::FractionOutOfRange {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = IndexerConfig::default();

        assert_eq!(config.indexer_name, "celestia_indexer");
        assert_eq!(config.fee_denom, "utia");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.slashing_double_sign, BigDecimal::from_str("0.05").unwrap());
        assert!(config.data_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides() {
        let config = IndexerConfig::from_lookup(lookup(&[
            ("IDX_INDEXER_NAME", "mocha"),
            ("IDX_SLASHING_DOWNTIME", "0.0001"),
            ("IDX_MAX_RETRIES", "7"),
            ("IDX_PARTITION_PERIOD", "Yearly"),
            ("IDX_INPUT", "/tmp/blocks.jsonl"),
        ]))
        .unwrap();

        assert_eq!(config.indexer_name, "mocha");
        assert_eq!(config.slashing_downtime, BigDecimal::from_str("0.0001").unwrap());
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.partition_period, PartitionPeriod::Yearly);
        assert_eq!(config.input, Some(PathBuf::from("/tmp/blocks.jsonl")));
        assert_eq!(config.coordinator().indexer_name, "mocha");
    }

    #[test]
    fn test_unparsable_override_rejected() {
        let err = IndexerConfig::from_lookup(lookup(&[("IDX_MAX_RETRIES", "many")])).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "IDX_MAX_RETRIES",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let config = IndexerConfig {
            indexer_name: " ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyField {
                field: "indexer_name"
            })
        );
    }

    #[test]
    fn test_validate_rejects_fraction_above_one() {
        let err = IndexerConfig::from_lookup(lookup(&[("IDX_SLASHING_DOUBLE_SIGN", "1.5")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FractionOutOfRange { .. }));
    }
}
