use thiserror::Error;

use harvest_core::{ClientError, CoreError};
use harvest_model::ModelError;

use crate::cursor::CursorError;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("invalid poll config: {0}")]
    Config(#[from] ModelError),

    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to decompress response: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("source reported error: {0}")]
    Rejected(String),

    #[error("cursor error: {0}")]
    Cursor(#[from] CursorError),

    #[error("failed to encode checkpoint: {0}")]
    Encode(#[source] ModelError),

    #[error("checkpoint store failed: {0}")]
    Checkpoint(#[source] ClientError),

    #[error("downstream write failed: {0}")]
    Write(#[source] ClientError),
}

impl From<SourceError> for CoreError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Config(e) => CoreError::InvalidConfig(e),
            other => CoreError::Collect(Box::new(other)),
        }
    }
}
