//! Top-level collection service: owns the clients, the partition listeners,
//! the heartbeat reporter and the job cache.

mod config;
pub use config::ServiceConfig;

mod errors;
pub use errors::ServiceError;

mod connector;
pub use connector::ClientConnector;

mod service;
pub use service::{CollectService, ServiceState};
