use std::{sync::Arc, time::Duration};

use harvest_model::PartitionId;
use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    client::{BrokerClient, StartOffset},
    error::ClientError,
    dispatch::TaskDispatcher,
};

const SLOT: &str = "harvest-partition-listener";

const READ_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Consumption loop of one task-topic partition.
///
/// Reads from the newest offset and hands every envelope to the dispatcher in
/// delivery order until the token is cancelled or the partition stream ends.
pub fn partition_listener(
    topic: impl Into<String>,
    partition: PartitionId,
    broker: Arc<dyn BrokerClient>,
    dispatcher: TaskDispatcher,
) -> TaskRef {
    let topic: Arc<str> = Arc::from(topic.into());

    TaskFn::arc(SLOT, move |ctx: CancellationToken| {
        let topic = Arc::clone(&topic);
        let broker = Arc::clone(&broker);
        let dispatcher = dispatcher.clone();

        async move {
            if ctx.is_cancelled() {
                return Err(TaskError::Canceled);
            }

            let mut reader = broker
                .open_partition(&topic, partition, StartOffset::Newest)
                .await
                .map_err(|e| {
                    let reason = format!("failed to open partition {partition} of {topic}: {e}");
                    match e {
                        ClientError::Closed => TaskError::Fatal { reason },
                        _ => TaskError::Fail { reason },
                    }
                })?;
            info!(topic = %topic, partition, "partition listener started");

            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    next = reader.next() => match next {
                        Ok(Some(envelope)) => {
                            dispatcher.dispatch(&envelope).await;
                        }
                        Ok(None) => {
                            debug!(topic = %topic, partition, "partition stream closed");
                            break;
                        }
                        Err(e) => {
                            warn!(topic = %topic, partition, error = %e, "failed to read task records");
                            tokio::select! {
                                _ = ctx.cancelled() => break,
                                _ = tokio::time::sleep(READ_RETRY_DELAY) => {}
                            }
                        }
                    },
                }
            }

            info!(topic = %topic, partition, "partition listener stopped");
            Ok(())
        }
    })
}
