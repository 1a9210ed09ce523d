mod tasks;
pub use tasks::{node_path, records, report};

mod config;
pub use config::{DEFAULT_INTERVAL, HeartbeatConfig, HeartbeatTransport};

mod errors;
pub use errors::HeartbeatError;
