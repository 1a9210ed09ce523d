use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("required key is missing: {0}")]
    MissingKey(String),

    #[error("required key is empty: {0}")]
    EmptyKey(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("record is missing field: {0}")]
    MissingField(String),

    #[error("record is not an object")]
    NotAnObject,

    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
