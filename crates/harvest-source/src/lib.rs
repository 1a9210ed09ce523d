//! Incremental-poll collection job.
//!
//! A job of this kind pages through a timestamp-ordered source feed. Every
//! callback fetches one page at the checkpointed cursor, drops records already
//! emitted at the cursor timestamp, forwards the rest to the job's writer and
//! then commits the next checkpoint.

pub mod cursor;
pub use cursor::{CursorError, Reconciled, TIME_TEMPLATE, reconcile};

mod error;
pub use error::SourceError;

mod config;
pub use config::{
    DEFAULT_ID_FIELD, KEY_ENDPOINT, KEY_ID_FIELD, KEY_NEXT_RECORD_TIME, KEY_RECORD_COUNT,
    KEY_TIMESTAMP_FIELD, PollConfig,
};

mod guard;
pub use guard::{PollGuard, PollPermit};

mod state;
pub use state::CheckpointCache;

mod poller;
pub use poller::{REQUEST_TIMEOUT, SourcePoller, decode_body, parse_page};

mod reader;
pub use reader::{IncrementalReader, PollOutcome};

mod builder;
pub use builder::IncrementalJobBuilder;
