//! Row encoding: bincode values, big-endian identities.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::StoreError;

pub(crate) fn encode<T: Serialize + ?Sized>(
    operation: &'static str,
    value: &T,
) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::new(operation, e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(
    operation: &'static str,
    bytes: &[u8],
) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::new(operation, e.to_string()))
}

pub(crate) fn encode_id(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

pub(crate) fn decode_id(operation: &'static str, bytes: &[u8]) -> Result<u64, StoreError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        StoreError::new(operation, format!("corrupt identity of {} bytes", bytes.len()))
    })?;
    Ok(u64::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Address, Validator};

    #[test]
    fn test_row_survives_encoding() {
        let mut validator = Validator {
            id: 3,
            address: "celestiavaloper1xyz".into(),
            moniker: "node".into(),
            ..Default::default()
        };
        validator.stake = "12.5".parse().unwrap();

        let bytes = encode("test", &validator).unwrap();
        let back: Validator = decode("test", &bytes).unwrap();

        assert_eq!(back, validator);
    }

    #[test]
    fn test_corrupt_row_reports_operation() {
        let err = decode::<Address>("load_address", &[1, 2]).unwrap_err();
        assert_eq!(err.operation, "load_address");
    }

    #[test]
    fn test_identity_bytes() {
        assert_eq!(decode_id("seq", &encode_id(513)).unwrap(), 513);
        assert!(decode_id("seq", &[0, 1]).is_err());
    }
}
