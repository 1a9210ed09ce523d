use harvest_core::ClientError;
use harvest_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeartbeatError {
    #[error("invalid heartbeat config: {0}")]
    InvalidConfig(String),

    #[error("failed to encode heartbeat: {0}")]
    Encode(#[from] ModelError),

    #[error("failed to publish heartbeat: {0}")]
    Publish(#[from] ClientError),
}
