use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Current checkpoint format version.
pub const STATE_VERSION: &str = "1";

/// Persisted collection checkpoint of one task.
///
/// Resume from `next_record_time`; the IDs in `last_time_records` carry exactly that
/// timestamp and were already emitted.
/// Field names are stable across versions, `version` is reserved for format changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CollectionState {
    pub version: String,
    pub next_record_time: String,
    #[serde(default)]
    pub last_time_records: Vec<String>,
}

impl CollectionState {
    pub fn new(next_record_time: impl Into<String>, last_time_records: Vec<String>) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            next_record_time: next_record_time.into(),
            last_time_records,
        }
    }

    /// State seeded from the task's configured start time, nothing emitted yet.
    pub fn initial(next_record_time: impl Into<String>) -> Self {
        Self::new(next_record_time, Vec::new())
    }

    /// `true` when no cursor is known.
    pub fn is_empty(&self) -> bool {
        self.next_record_time.is_empty()
    }

    /// `true` when some records at the cursor timestamp were already emitted.
    pub fn has_boundary(&self) -> bool {
        !self.last_time_records.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, ModelError> {
        Ok(serde_json::from_slice(raw)?)
    }
}
