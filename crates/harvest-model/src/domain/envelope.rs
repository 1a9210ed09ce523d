use std::collections::BTreeMap;

/// Unit of data exchanged with writers and readers.
///
/// `meta_info` describes where the data came from, `raw_data` holds one entry per record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub meta_info: BTreeMap<String, String>,
    pub raw_data: Vec<Vec<u8>>,
}

impl Envelope {
    pub fn new(meta_info: BTreeMap<String, String>, raw_data: Vec<Vec<u8>>) -> Self {
        Self {
            meta_info,
            raw_data,
        }
    }

    /// Envelope carrying a single record and no meta info.
    pub fn single(raw: impl Into<Vec<u8>>) -> Self {
        Self {
            meta_info: BTreeMap::new(),
            raw_data: vec![raw.into()],
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta_info.insert(key.into(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta_info.get(key).map(String::as_str)
    }

    pub fn push(&mut self, raw: impl Into<Vec<u8>>) {
        self.raw_data.push(raw.into());
    }

    pub fn len(&self) -> usize {
        self.raw_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_data.is_empty()
    }
}
