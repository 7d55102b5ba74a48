//! Serde adapter for byte payloads on the JSON wire.
//!
//! Snapshot and image payloads are raw bytes; inside the JSON envelope
//! they travel as standard base64 strings. Use with
//! `#[serde(with = "navrec_common::b64")]` on `Vec<u8>` fields.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        #[serde(with = "crate::b64")]
        data: Vec<u8>,
    }

    #[test]
    fn test_bytes_survive_the_wire() {
        let blob = Blob {
            data: (0u8..=255).collect(),
        };
        let encoded = serde_json::to_string(&blob).unwrap();
        let decoded: Blob = serde_json::from_str(&encoded).unwrap();
        assert_eq!(blob, decoded);
    }

    #[test]
    fn test_empty_payload() {
        let blob = Blob { data: vec![] };
        let encoded = serde_json::to_value(&blob).unwrap();
        assert_eq!(encoded, serde_json::json!({"data": ""}));
    }

    #[test]
    fn test_invalid_base64_is_an_error() {
        let result: Result<Blob, _> =
            serde_json::from_value(serde_json::json!({"data": "not-base64!!"}));
        assert!(result.is_err());
    }
}
