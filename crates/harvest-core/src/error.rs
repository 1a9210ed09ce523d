use thiserror::Error;

use harvest_model::ModelError;

/// Failure reported by an external collaborator (broker, coordination service,
/// checkpoint store, writer).
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("client is closed")]
    Closed,

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("no job builder registered for app: {0}")]
    UnknownApp(String),

    #[error("invalid task config: {0}")]
    InvalidConfig(#[from] ModelError),

    #[error("job builder {0} has released its clients")]
    BuilderClosed(String),

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("failed to resolve host name: {0}")]
    Host(String),

    #[error("collection failed: {0}")]
    Collect(#[source] Box<dyn std::error::Error + Send + Sync>),
}
