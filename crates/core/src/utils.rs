//! Utils for serde and time.

use chrono::Utc;

/// Serialize bytes as a base64 string, so values stay compact inside JSON payloads.
pub mod base64_bytes {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_str(&base64::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        base64::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Milliseconds since epoch.
pub fn get_epoch_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
