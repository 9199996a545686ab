//! Wire encoding helpers.
//!
//! Transport blobs are base64 of a JSON object whose byte fields are
//! themselves base64 strings. Both layers use the standard alphabet with
//! padding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Encode a value as base64-of-JSON.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value).map_err(|e| Error::Encoding {
        reason: e.to_string(),
    })?;
    Ok(STANDARD.encode(json))
}

/// Decode a base64-of-JSON blob.
pub(crate) fn decode<T: DeserializeOwned>(data: &str) -> Result<T> {
    let json = STANDARD.decode(data.trim()).map_err(|e| Error::Encoding {
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&json).map_err(|e| Error::Encoding {
        reason: e.to_string(),
    })
}

/// Serde adapter storing byte fields as base64 strings.
pub(crate) mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
