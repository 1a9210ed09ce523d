use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Liveness record of one worker for one active application.
///
/// Serialized as a flat map of strings so every transport carries the same payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRecord {
    pub host: String,
    pub platform: String,
    pub app: String,
    #[serde(with = "as_string")]
    pub cpu_count: usize,
    /// Nanoseconds since the Unix epoch.
    #[serde(with = "as_string")]
    pub timestamp: u128,
}

impl HeartbeatRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, ModelError> {
        Ok(serde_json::from_slice(raw)?)
    }
}

mod as_string {
    use std::{fmt::Display, str::FromStr};

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
