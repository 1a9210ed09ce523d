use std::{convert::Infallible, str::FromStr, time::Duration};

use harvest_model::{HEARTBEAT_ROOT, TOPIC_TASK_STATS};

use crate::errors::HeartbeatError;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(6);

/// Where heartbeats are published.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeartbeatTransport {
    /// Ephemeral node per (host, app) in the coordination service.
    #[default]
    Coordination,
    /// One message per (host, app) on the stats topic.
    EventLog,
}

/// `kafka` (or `event-log`) selects the event log, anything else the coordination service.
impl FromStr for HeartbeatTransport {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "kafka" | "event-log" | "eventlog" => HeartbeatTransport::EventLog,
            _ => HeartbeatTransport::Coordination,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub host: String,
    pub interval: Duration,
    pub transport: HeartbeatTransport,
    /// Event-log topic.
    pub topic: String,
    /// Coordination root path.
    pub root: String,
}

impl HeartbeatConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            interval: DEFAULT_INTERVAL,
            transport: HeartbeatTransport::default(),
            topic: TOPIC_TASK_STATS.to_string(),
            root: HEARTBEAT_ROOT.to_string(),
        }
    }

    pub fn with_transport(mut self, transport: HeartbeatTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), HeartbeatError> {
        if self.host.trim().is_empty() {
            return Err(HeartbeatError::InvalidConfig("host is empty".into()));
        }
        if self.interval.is_zero() {
            return Err(HeartbeatError::InvalidConfig("interval must be positive".into()));
        }
        match self.transport {
            HeartbeatTransport::EventLog if self.topic.is_empty() => {
                Err(HeartbeatError::InvalidConfig("stats topic is empty".into()))
            }
            HeartbeatTransport::Coordination if !self.root.starts_with('/') => Err(
                HeartbeatError::InvalidConfig(format!("root {:?} is not absolute", self.root)),
            ),
            _ => Ok(()),
        }
    }
}
