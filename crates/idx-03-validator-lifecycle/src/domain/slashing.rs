//! Slashing parameters by jail reason.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;

pub const JAIL_REASON_DOUBLE_SIGN: &str = "double_sign";
pub const JAIL_REASON_MISSING_SIGNATURE: &str = "missing_signature";

/// Fraction of delegated stake removed per jail reason.
#[derive(Debug, Clone, PartialEq)]
pub struct SlashingConfig {
    pub double_sign: BigDecimal,
    pub downtime: BigDecimal,
}

impl SlashingConfig {
    pub fn new(double_sign: BigDecimal, downtime: BigDecimal) -> Self {
        Self {
            double_sign,
            downtime,
        }
    }

    /// Fraction for `reason`; zero for unrecognized reasons.
    pub fn fraction_for(&self, reason: &str) -> BigDecimal {
        match reason {
            JAIL_REASON_DOUBLE_SIGN => self.double_sign.clone(),
            JAIL_REASON_MISSING_SIGNATURE => self.downtime.clone(),
            _ => BigDecimal::from(0),
        }
    }
}

impl Default for SlashingConfig {
    /// 5% for double signing, nothing for downtime.
    fn default() -> Self {
        Self::new(BigDecimal::new(BigInt::from(5), 2), BigDecimal::from(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_fraction_by_reason() {
        let config = SlashingConfig::new(
            BigDecimal::from_str("0.05").unwrap(),
            BigDecimal::from_str("0.0001").unwrap(),
        );

        assert_eq!(config.fraction_for("double_sign"), BigDecimal::from_str("0.05").unwrap());
        assert_eq!(
            config.fraction_for("missing_signature"),
            BigDecimal::from_str("0.0001").unwrap()
        );
        assert_eq!(config.fraction_for("tombstoned"), BigDecimal::from(0));
    }

    #[test]
    fn test_default_fractions() {
        let config = SlashingConfig::default();
        assert_eq!(config.double_sign, BigDecimal::from_str("0.05").unwrap());
        assert_eq!(config.downtime, BigDecimal::from(0));
    }
}
