use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{KEY_APP, KEY_TASK, ModelError};

/// Validated task configuration decoded from one task-topic record.
///
/// The record itself is a flat string map. Construction fails when the
/// application type or the task identity is missing, so a `TaskConfig` in hand
/// always answers [`TaskConfig::app`] and [`TaskConfig::identity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct TaskConfig {
    values: BTreeMap<String, String>,
}

impl TaskConfig {
    /// Validate a raw map and wrap it.
    pub fn from_map(values: BTreeMap<String, String>) -> Result<Self, ModelError> {
        for key in [KEY_APP, KEY_TASK] {
            match values.get(key) {
                None => return Err(ModelError::MissingKey(key.to_string())),
                Some(v) if v.trim().is_empty() => {
                    return Err(ModelError::EmptyKey(key.to_string()));
                }
                Some(_) => {}
            }
        }
        Ok(Self { values })
    }

    /// Decode a JSON object of string values.
    pub fn from_slice(raw: &[u8]) -> Result<Self, ModelError> {
        let values: BTreeMap<String, String> = serde_json::from_slice(raw)?;
        Self::from_map(values)
    }

    /// Build from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Application type tag.
    pub fn app(&self) -> &str {
        &self.values[KEY_APP]
    }

    /// Stable task identity.
    pub fn identity(&self) -> &str {
        &self.values[KEY_TASK]
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of a key that must be present and non-empty.
    pub fn require(&self, key: &str) -> Result<&str, ModelError> {
        match self.values.get(key) {
            None => Err(ModelError::MissingKey(key.to_string())),
            Some(v) if v.trim().is_empty() => Err(ModelError::EmptyKey(key.to_string())),
            Some(v) => Ok(v.as_str()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl TryFrom<BTreeMap<String, String>> for TaskConfig {
    type Error = ModelError;

    fn try_from(values: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::from_map(values)
    }
}

impl From<TaskConfig> for BTreeMap<String, String> {
    fn from(config: TaskConfig) -> Self {
        config.values
    }
}
