use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing::{info, warn};

use harvest_core::{
    ClientError, DataWriter, JobFactory, WriterProvider,
    memory::{MemoryBroker, MemoryCheckpointer, MemoryCoordination, MemoryWriter},
};
use harvest_model::{Envelope, KEY_APP, KEY_HOST, KEY_SERVER_URL, KEY_TASK, TaskConfig};
use harvest_observe::{LoggerConfig, logger_init};
use harvest_service::{CollectService, ServiceConfig};
use harvest_source::{
    IncrementalJobBuilder, KEY_ENDPOINT, KEY_NEXT_RECORD_TIME, KEY_RECORD_COUNT,
    KEY_TIMESTAMP_FIELD,
};

/// Source instance to poll; without it the daemon only idles and heartbeats.
const ENV_SOURCE_URL: &str = "HARVEST_SOURCE_URL";
const TRIGGER_EVERY: Duration = Duration::from_secs(10);
const PARTITIONS: usize = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logger
    logger_init(&LoggerConfig::from_env()?)?;

    // Service config: optional JSON file as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_slice::<ServiceConfig>(&raw)
                .with_context(|| format!("parsing {path}"))?
        }
        None => ServiceConfig::default(),
    };

    // In-process collaborators
    let broker = Arc::new(MemoryBroker::new());
    broker.create_topic(&config.task_topic, PARTITIONS);
    let coordination = Arc::new(MemoryCoordination::new());
    let (sink, mut collected) = MemoryWriter::with_channel();
    let sink: Arc<dyn DataWriter> = Arc::new(sink);
    let writers: Arc<dyn WriterProvider> =
        Arc::new(move |_: &TaskConfig| -> Result<Arc<dyn DataWriter>, ClientError> {
            Ok(Arc::clone(&sink))
        });

    // Job builders
    let builder = IncrementalJobBuilder::new("snow", writers, Arc::new(MemoryCheckpointer::new()))?;
    let factory = Arc::new(JobFactory::new().with(Arc::new(builder)));

    let service = CollectService::new(config, factory, broker.clone(), coordination)?;
    service.start().await?;
    info!(host = %service.host(), "collector is running, press Ctrl+C to stop");

    tokio::spawn(async move {
        while let Some(envelope) = collected.recv().await {
            for line in &envelope.raw_data {
                info!(record = %String::from_utf8_lossy(line), "collected");
            }
        }
    });

    if let Ok(server) = std::env::var(ENV_SOURCE_URL) {
        let task = demo_task(&server, service.host())?;
        let topic = service.config().task_topic.clone();
        let broker = broker.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TRIGGER_EVERY);
            loop {
                ticker.tick().await;
                if let Err(e) = broker.publish(&topic, 0, task.clone()) {
                    warn!(error = %e, "failed to publish demo task");
                    break;
                }
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down...");
    service.stop().await;
    Ok(())
}

/// Task envelope for the incident table of `server`, addressed to `host`.
fn demo_task(server: &str, host: &str) -> anyhow::Result<Envelope> {
    let task = serde_json::json!({
        KEY_APP: "snow",
        KEY_TASK: "snow-incident",
        KEY_SERVER_URL: server,
        KEY_ENDPOINT: "incident",
        KEY_TIMESTAMP_FIELD: "sys_updated_on",
        KEY_NEXT_RECORD_TIME: "2015-01-01 00:00:00",
        KEY_RECORD_COUNT: "100",
    });
    Ok(Envelope::single(serde_json::to_vec(&task)?).with_meta(KEY_HOST, host))
}
