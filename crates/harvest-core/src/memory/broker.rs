use std::{
    collections::HashMap,
    hash::{DefaultHasher, Hash, Hasher},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use harvest_model::{Envelope, PartitionId};
use tokio::sync::broadcast;
use tracing::warn;

use crate::{
    client::{BrokerClient, DataWriter, PartitionReader, StartOffset},
    error::ClientError,
};

const DEFAULT_CAPACITY: usize = 1024;

/// In-process partitioned topics.
///
/// Partitions keep no history: a reader sees what is published after it was
/// opened, so [`StartOffset::Oldest`] behaves like [`StartOffset::Newest`].
pub struct MemoryBroker {
    topics: Mutex<HashMap<String, Vec<broadcast::Sender<Envelope>>>>,
    capacity: usize,
    closed: AtomicBool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Broker whose partitions buffer at most `capacity` unread envelopes per reader.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Create `topic` with `partitions` partitions unless it already exists.
    pub fn create_topic(&self, topic: &str, partitions: usize) {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics.entry(topic.to_string()).or_insert_with(|| {
            (0..partitions.max(1))
                .map(|_| broadcast::channel(self.capacity).0)
                .collect()
        });
    }

    /// Publish to one partition; returns the number of readers that received it.
    pub fn publish(
        &self,
        topic: &str,
        partition: PartitionId,
        envelope: Envelope,
    ) -> Result<usize, ClientError> {
        let sender = self.sender(topic, partition)?;
        Ok(sender.send(envelope).unwrap_or(0))
    }

    fn sender(
        &self,
        topic: &str,
        partition: PartitionId,
    ) -> Result<broadcast::Sender<Envelope>, ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let partitions = topics
            .get(topic)
            .ok_or_else(|| ClientError::NotFound(format!("topic {topic}")))?;
        usize::try_from(partition)
            .ok()
            .and_then(|idx| partitions.get(idx))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("partition {partition} of {topic}")))
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for MemoryBroker {
    async fn topic_partitions(
        &self,
        topic: &str,
    ) -> Result<HashMap<String, Vec<PartitionId>>, ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let partitions = topics
            .get(topic)
            .ok_or_else(|| ClientError::NotFound(format!("topic {topic}")))?;
        let ids = (0..partitions.len())
            .map(|idx| PartitionId::try_from(idx).unwrap_or(PartitionId::MAX))
            .collect();
        Ok(HashMap::from([(topic.to_string(), ids)]))
    }

    async fn open_partition(
        &self,
        topic: &str,
        partition: PartitionId,
        _offset: StartOffset,
    ) -> Result<Box<dyn PartitionReader>, ClientError> {
        let sender = self.sender(topic, partition)?;
        Ok(Box::new(MemoryPartitionReader {
            rx: sender.subscribe(),
        }))
    }

    fn writer(&self, topic: &str, key: &str) -> Result<Arc<dyn DataWriter>, ClientError> {
        self.create_topic(topic, 1);
        let partitions = {
            let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
            topics.get(topic).map(Vec::len).unwrap_or(1)
        };
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() % partitions as u64) as usize;
        let partition = PartitionId::try_from(idx).unwrap_or_default();

        Ok(Arc::new(MemoryTopicWriter {
            sender: self.sender(topic, partition)?,
            key: key.to_string(),
        }))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.topics
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }
}

/// Reader of one [`MemoryBroker`] partition.
pub struct MemoryPartitionReader {
    rx: broadcast::Receiver<Envelope>,
}

#[async_trait]
impl PartitionReader for MemoryPartitionReader {
    async fn next(&mut self) -> Result<Option<Envelope>, ClientError> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => return Ok(Some(envelope)),
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "partition reader lagged behind, records dropped");
                }
            }
        }
    }
}

/// Writer publishing every envelope to a single [`MemoryBroker`] partition.
pub struct MemoryTopicWriter {
    sender: broadcast::Sender<Envelope>,
    key: String,
}

#[async_trait]
impl DataWriter for MemoryTopicWriter {
    async fn start(&self) {}

    async fn stop(&self) {}

    async fn write_data(&self, envelope: Envelope) -> Result<(), ClientError> {
        let _ = self.sender.send(envelope.with_meta("Key", self.key.clone()));
        Ok(())
    }
}
