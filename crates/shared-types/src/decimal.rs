//! Serde adapter storing `BigDecimal` as its exact string form.
//!
//! The row codec is not self-describing, so decimals go through a plain
//! string instead of the crate's `deserialize_any` based implementation.

use bigdecimal::BigDecimal;
use serde::{de, Deserialize, Deserializer, Serializer};
use std::str::FromStr;

pub fn serialize<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(value)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    BigDecimal::from_str(&raw).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use serde::{Deserialize, Serialize};
    use std::str::FromStr;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Row {
        #[serde(with = "super")]
        amount: BigDecimal,
    }

    #[test]
    fn test_decimal_survives_binary_codec() {
        let row = Row {
            amount: BigDecimal::from_str("123456789012345678901234567890.5").unwrap(),
        };
        let bytes = bincode::serialize(&row).unwrap();
        assert_eq!(bincode::deserialize::<Row>(&bytes).unwrap(), row);
    }

    #[test]
    fn test_decimal_is_a_json_string() {
        let row = Row {
            amount: BigDecimal::from(42),
        };
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"amount":"42"}"#);
    }
}
