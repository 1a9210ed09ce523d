mod keys;
pub use keys::*;

mod task_config;
pub use task_config::TaskConfig;

mod collection_state;
pub use collection_state::{CollectionState, STATE_VERSION};

mod record;
pub use record::{Page, Record};

mod envelope;
pub use envelope::Envelope;

mod heartbeat;
pub use heartbeat::HeartbeatRecord;

/// Application type tag used to pick a job builder.
pub type AppType = String;

/// Partition number of a topic on the event-log broker.
pub type PartitionId = i32;
