//! Well-known configuration and metadata keys.
//!
//! Task records travel as flat string maps, so every component agrees on these names.

/// Application type of a task (selects the job builder).
pub const KEY_APP: &str = "App";
/// Stable task identity, used as the job cache key.
pub const KEY_TASK: &str = "TaskConfigKey";
/// Host affinity marker carried in an envelope's meta info.
pub const KEY_HOST: &str = "Host";
/// Base URL of the external source.
pub const KEY_SERVER_URL: &str = "ServerURL";
/// Basic auth user for the external source.
pub const KEY_USERNAME: &str = "Username";
/// Basic auth password for the external source.
pub const KEY_PASSWORD: &str = "Password";

/// Topic the task definitions are published to.
pub const TOPIC_TASKS: &str = "Tasks";
/// Topic heartbeats are published to in event-log mode.
pub const TOPIC_TASK_STATS: &str = "TaskStats";
/// Root node for heartbeats in coordination mode.
pub const HEARTBEAT_ROOT: &str = "/harvest/heartbeats";
