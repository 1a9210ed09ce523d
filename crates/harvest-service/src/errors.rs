use harvest_core::{ClientError, CoreError};
use harvest_heartbeat::HeartbeatError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid service config: {0}")]
    InvalidConfig(String),

    #[error("failed to resolve host: {0}")]
    Host(#[source] CoreError),

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("topic {0} has no partitions")]
    NoPartitions(String),

    #[error("heartbeat: {0}")]
    Heartbeat(#[from] HeartbeatError),

    #[error("service was stopped and cannot be restarted")]
    Closed,
}
