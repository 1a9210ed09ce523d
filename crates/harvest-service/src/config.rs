use std::time::Duration;

use harvest_core::restart_backoff;
use harvest_heartbeat::{DEFAULT_INTERVAL, HeartbeatConfig, HeartbeatTransport};
use harvest_model::TOPIC_TASKS;
use serde::{Deserialize, Serialize};
use taskvisor::BackoffPolicy;

use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ServiceConfig {
    /// Topic carrying task definitions.
    pub task_topic: String,
    /// Heartbeat transport setting: `kafka` selects the event log.
    pub heartbeat: String,
    pub heartbeat_interval_ms: u64,
    /// First delay before restarting a failed listener or reporter.
    pub restart_delay_ms: u64,
    /// Upper bound of the restart delay.
    pub restart_max_delay_ms: u64,
    /// Host identity override; the system host name otherwise.
    pub host: Option<String>,
    /// Broker bootstrap addresses, handed to the [`crate::ClientConnector`].
    pub brokers: Vec<String>,
    /// Coordination service addresses.
    pub coordination: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            task_topic: TOPIC_TASKS.to_string(),
            heartbeat: "zookeeper".to_string(),
            heartbeat_interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            restart_delay_ms: 1_000,
            restart_max_delay_ms: 30_000,
            host: None,
            brokers: Vec::new(),
            coordination: Vec::new(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.task_topic.trim().is_empty() {
            return Err(ServiceError::InvalidConfig("task topic is empty".into()));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ServiceError::InvalidConfig(
                "heartbeat interval must be positive".into(),
            ));
        }
        if self.restart_delay_ms == 0 || self.restart_max_delay_ms < self.restart_delay_ms {
            return Err(ServiceError::InvalidConfig(
                "restart delays must be positive and ordered".into(),
            ));
        }
        if self.host.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(ServiceError::InvalidConfig("host override is empty".into()));
        }
        Ok(())
    }

    pub fn heartbeat_transport(&self) -> HeartbeatTransport {
        self.heartbeat
            .parse()
            .unwrap_or(HeartbeatTransport::Coordination)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Backoff between restarts of the supervised loops.
    pub fn restart_backoff(&self) -> BackoffPolicy {
        restart_backoff(
            Duration::from_millis(self.restart_delay_ms),
            Duration::from_millis(self.restart_max_delay_ms),
        )
    }

    /// Reporter settings for `host`.
    pub fn heartbeat_config(&self, host: &str) -> HeartbeatConfig {
        HeartbeatConfig::new(host)
            .with_transport(self.heartbeat_transport())
            .with_interval(self.heartbeat_interval())
    }
}
