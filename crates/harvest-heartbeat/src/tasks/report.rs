use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use harvest_core::{
    BrokerClient, ClientError, CoordinationClient, DataWriter, JobFactory, cpu_count, platform,
};
use harvest_model::{Envelope, HeartbeatRecord, KEY_APP, KEY_HOST};
use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{HeartbeatConfig, HeartbeatTransport};
use crate::errors::HeartbeatError;

const SLOT: &str = "harvest-heartbeat";

/// Coordination node of one (host, app) pair.
pub fn node_path(root: &str, host: &str, app: &str) -> String {
    format!("{}/{host}!{app}", root.trim_end_matches('/'))
}

/// One heartbeat per active application.
pub fn records(host: &str, apps: &[String], timestamp: u128) -> Vec<HeartbeatRecord> {
    let platform = platform();
    let cpus = cpu_count();
    apps.iter()
        .map(|app| HeartbeatRecord {
            host: host.to_string(),
            platform: platform.to_string(),
            app: app.clone(),
            cpu_count: cpus,
            timestamp,
        })
        .collect()
}

/// Periodic liveness reporter.
///
/// Every tick publishes one record per application the factory has built a job
/// for. In event-log mode the reporter owns a dedicated writer keyed by the
/// stats topic, started with the task and stopped when it ends.
///
/// A closed client is fatal; other writer failures are retryable.
pub fn report(
    config: HeartbeatConfig,
    factory: Arc<JobFactory>,
    coordination: Arc<dyn CoordinationClient>,
    broker: Arc<dyn BrokerClient>,
) -> TaskRef {
    let config = Arc::new(config);

    TaskFn::arc(SLOT, move |ctx: CancellationToken| {
        let config = Arc::clone(&config);
        let factory = Arc::clone(&factory);
        let coordination = Arc::clone(&coordination);
        let broker = Arc::clone(&broker);

        async move {
            if ctx.is_cancelled() {
                return Err(TaskError::Canceled);
            }

            let publisher = match config.transport {
                HeartbeatTransport::Coordination => Publisher::Coordination(coordination),
                HeartbeatTransport::EventLog => {
                    let writer = broker.writer(&config.topic, &config.topic).map_err(|e| {
                        let reason = format!("failed to create heartbeat writer: {e}");
                        match e {
                            ClientError::Closed => TaskError::Fatal { reason },
                            _ => TaskError::Fail { reason },
                        }
                    })?;
                    writer.start().await;
                    Publisher::EventLog(writer)
                }
            };
            info!(
                host = %config.host,
                transport = ?config.transport,
                interval_ms = config.interval.as_millis() as u64,
                "heartbeat reporter started"
            );

            let mut ticker = interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    _ = ticker.tick() => {
                        let apps = factory.apps();
                        for record in records(&config.host, &apps, now_nanos()) {
                            if let Err(e) = publisher.publish(&config, &record).await {
                                warn!(app = %record.app, error = %e, "heartbeat publish failed");
                            }
                        }
                        debug!(apps = apps.len(), "heartbeat sent");
                    }
                }
            }

            publisher.finish().await;
            info!(host = %config.host, "heartbeat reporter stopped");
            Ok(())
        }
    })
}

enum Publisher {
    Coordination(Arc<dyn CoordinationClient>),
    EventLog(Arc<dyn DataWriter>),
}

impl Publisher {
    async fn publish(
        &self,
        config: &HeartbeatConfig,
        record: &HeartbeatRecord,
    ) -> Result<(), HeartbeatError> {
        let payload = record.to_bytes()?;
        match self {
            Publisher::Coordination(client) => {
                let path = node_path(&config.root, &record.host, &record.app);
                client.create_node(&path, payload, true, true).await?;
            }
            Publisher::EventLog(writer) => {
                let envelope = Envelope::single(payload)
                    .with_meta(KEY_HOST, record.host.clone())
                    .with_meta(KEY_APP, record.app.clone());
                writer.write_data(envelope).await?;
            }
        }
        Ok(())
    }

    async fn finish(&self) {
        if let Publisher::EventLog(writer) = self {
            writer.stop().await;
        }
    }
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}
