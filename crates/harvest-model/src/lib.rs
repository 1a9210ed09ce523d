//! Data model shared by the harvest crates.
//!
//! Everything here is plain data: task configuration decoded from the task topic,
//! the persisted collection checkpoint, source records, envelopes exchanged with
//! writers and readers, and heartbeat records.

mod domain;
pub use domain::*;

mod error;
pub use error::ModelError;
