use serde_json::{Map, Value};

use crate::ModelError;

/// One source record with its identity fields pulled out.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    timestamp: String,
    fields: Map<String, Value>,
}

impl Record {
    /// Decode a source entry, requiring string `id_field` and `timestamp_field` values.
    pub fn from_value(
        value: Value,
        id_field: &str,
        timestamp_field: &str,
    ) -> Result<Self, ModelError> {
        let Value::Object(fields) = value else {
            return Err(ModelError::NotAnObject);
        };
        let id = string_field(&fields, id_field)?;
        let timestamp = string_field(&fields, timestamp_field)?;
        Ok(Self {
            id,
            timestamp,
            fields,
        })
    }

    /// Record with only its identity fields, mostly useful for tests and fixtures.
    pub fn new(id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: timestamp.into(),
            fields: Map::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Normalized downstream line: `key="value"` pairs joined by commas.
    pub fn render(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}=\"{s}\""),
                other => format!("{k}=\"{other}\""),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String, ModelError> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ModelError::MissingField(name.to_string()))
}

/// One fetched result window, ascending by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    records: Vec<Record>,
    fetched: usize,
}

impl Page {
    pub fn new(records: Vec<Record>) -> Self {
        let fetched = records.len();
        Self { records, fetched }
    }

    /// Page whose source returned `fetched` raw entries, some possibly dropped on decode.
    pub fn with_fetched(records: Vec<Record>, fetched: usize) -> Self {
        Self {
            fetched: fetched.max(records.len()),
            records,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of raw entries the source returned.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
