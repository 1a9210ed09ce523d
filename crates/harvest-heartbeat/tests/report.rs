use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use harvest_core::{
    BrokerClient, ClientError, CoordinationClient, CoreError, DataWriter, Job, JobBuilder,
    JobFactory, JobRef, PartitionReader, StartOffset,
    memory::{MemoryBroker, MemoryCoordination},
};
use harvest_heartbeat::{HeartbeatConfig, HeartbeatTransport, report};
use harvest_model::{HeartbeatRecord, KEY_APP, KEY_TASK, PartitionId, TOPIC_TASK_STATS, TaskConfig};
use tokio_util::sync::CancellationToken;

struct IdleJob(String);

#[async_trait]
impl Job for IdleJob {
    fn name(&self) -> &str {
        &self.0
    }
    async fn start(&self) {}
    async fn stop(&self) {}
    async fn callback(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

struct IdleBuilder(&'static str);

impl JobBuilder for IdleBuilder {
    fn name(&self) -> &'static str {
        "idle"
    }
    fn app(&self) -> &str {
        self.0
    }
    fn build_job(&self, config: &TaskConfig) -> Result<JobRef, CoreError> {
        Ok(Arc::new(IdleJob(config.identity().to_string())))
    }
}

/// Factory with one built job per app in `built`; `registered` apps without a job stay inactive.
fn factory(registered: &[&'static str], built: &[&'static str]) -> Arc<JobFactory> {
    let mut factory = JobFactory::new();
    for &app in registered {
        factory.register(Arc::new(IdleBuilder(app)));
    }
    for &app in built {
        let task = TaskConfig::from_pairs([(KEY_APP, app), (KEY_TASK, "t")]).unwrap();
        factory.build(app, &task).unwrap();
    }
    Arc::new(factory)
}

fn config(transport: HeartbeatTransport) -> HeartbeatConfig {
    HeartbeatConfig::new("worker-1")
        .with_transport(transport)
        .with_interval(Duration::from_millis(50))
}

async fn wait_for(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn coordination_mode_writes_ephemeral_node_per_active_app() {
    let coordination = Arc::new(MemoryCoordination::new());
    let broker = Arc::new(MemoryBroker::new());
    let token = CancellationToken::new();

    let task = report(
        config(HeartbeatTransport::Coordination),
        factory(&["jira", "snow"], &["snow"]),
        coordination.clone(),
        broker,
    );
    let handle = tokio::spawn(task.spawn(token.clone()));

    let coord = coordination.clone();
    wait_for(move || !coord.paths("/harvest/heartbeats/").is_empty()).await;
    token.cancel();
    assert!(handle.await.unwrap().is_ok());

    assert_eq!(
        coordination.paths("/harvest/heartbeats/"),
        vec!["/harvest/heartbeats/worker-1!snow".to_string()]
    );
    let node = coordination
        .node("/harvest/heartbeats/worker-1!snow")
        .unwrap();
    assert!(node.ephemeral);
    let record = HeartbeatRecord::from_bytes(&node.payload).unwrap();
    assert_eq!(record.host, "worker-1");
    assert_eq!(record.app, "snow");
}

#[tokio::test]
async fn event_log_mode_publishes_to_stats_topic() {
    let coordination = Arc::new(MemoryCoordination::new());
    let broker = Arc::new(MemoryBroker::new());
    broker.create_topic(TOPIC_TASK_STATS, 1);
    let mut stats = broker
        .open_partition(TOPIC_TASK_STATS, 0, StartOffset::Newest)
        .await
        .unwrap();
    let token = CancellationToken::new();

    let task = report(
        config(HeartbeatTransport::EventLog),
        factory(&["jira", "snow"], &["jira", "snow"]),
        coordination.clone(),
        broker.clone(),
    );
    let handle = tokio::spawn(task.spawn(token.clone()));

    let mut apps = Vec::new();
    for _ in 0..2 {
        let envelope = tokio::time::timeout(Duration::from_secs(5), stats.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(envelope.meta("Host"), Some("worker-1"));
        assert_eq!(envelope.meta("Key"), Some(TOPIC_TASK_STATS));
        let record = HeartbeatRecord::from_bytes(&envelope.raw_data[0]).unwrap();
        apps.push(record.app);
    }
    token.cancel();
    assert!(handle.await.unwrap().is_ok());

    apps.sort();
    assert_eq!(apps, vec!["jira", "snow"]);
    assert!(coordination.paths("/").is_empty());
}

#[tokio::test]
async fn publish_failures_do_not_stop_the_reporter() {
    let coordination = Arc::new(MemoryCoordination::new());
    coordination.close().await;
    let token = CancellationToken::new();

    let task = report(
        config(HeartbeatTransport::Coordination),
        factory(&["snow"], &["snow"]),
        coordination,
        Arc::new(MemoryBroker::new()),
    );
    let handle = tokio::spawn(task.spawn(token.clone()));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!handle.is_finished());

    token.cancel();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn closed_broker_is_fatal_in_event_log_mode() {
    let broker = Arc::new(MemoryBroker::new());
    broker.close().await;

    let task = report(
        config(HeartbeatTransport::EventLog),
        factory(&["snow"], &["snow"]),
        Arc::new(MemoryCoordination::new()),
        broker,
    );
    let result = task.spawn(CancellationToken::new()).await;

    assert!(matches!(result, Err(taskvisor::TaskError::Fatal { .. })));
}

/// Broker whose writers cannot be created.
struct NoWriterBroker;

#[async_trait]
impl BrokerClient for NoWriterBroker {
    async fn topic_partitions(
        &self,
        _topic: &str,
    ) -> Result<HashMap<String, Vec<PartitionId>>, ClientError> {
        Ok(HashMap::new())
    }

    async fn open_partition(
        &self,
        topic: &str,
        _partition: PartitionId,
        _offset: StartOffset,
    ) -> Result<Box<dyn PartitionReader>, ClientError> {
        Err(ClientError::NotFound(topic.to_string()))
    }

    fn writer(&self, _topic: &str, _key: &str) -> Result<Arc<dyn DataWriter>, ClientError> {
        Err(ClientError::Request("broker unavailable".into()))
    }

    async fn close(&self) {}
}

#[tokio::test]
async fn writer_failure_is_retryable_in_event_log_mode() {
    let task = report(
        config(HeartbeatTransport::EventLog),
        factory(&["snow"], &["snow"]),
        Arc::new(MemoryCoordination::new()),
        Arc::new(NoWriterBroker),
    );
    let result = task.spawn(CancellationToken::new()).await;

    assert!(matches!(result, Err(taskvisor::TaskError::Fail { .. })));
}
