//! Contracts of the external collaborators.
//!
//! Wire protocols live behind these traits; the orchestrator only relies on the
//! operations below. In-process implementations are in [`crate::memory`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use harvest_model::{Envelope, PartitionId, TaskConfig};

use crate::error::{ClientError, CoreError};

/// Downstream sink for collected data.
#[async_trait]
pub trait DataWriter: Send + Sync + 'static {
    async fn start(&self);
    async fn stop(&self);
    async fn write_data(&self, envelope: Envelope) -> Result<(), ClientError>;
}

/// Pulls one unit of work from a source and forwards it to its writer.
#[async_trait]
pub trait DataReader: Send + Sync + 'static {
    async fn start(&self);
    async fn stop(&self);
    async fn index_data(&self) -> Result<(), CoreError>;
}

/// Durable key→blob store for checkpoints, keyed by task.
#[async_trait]
pub trait Checkpointer: Send + Sync + 'static {
    async fn start(&self);
    async fn stop(&self);
    async fn get_checkpoint(&self, config: &TaskConfig) -> Result<Option<Vec<u8>>, ClientError>;
    async fn write_checkpoint(&self, config: &TaskConfig, data: Vec<u8>) -> Result<(), ClientError>;
}

/// Coordination service (ephemeral nodes).
#[async_trait]
pub trait CoordinationClient: Send + Sync + 'static {
    async fn create_node(
        &self,
        path: &str,
        payload: Vec<u8>,
        ephemeral: bool,
        overwrite: bool,
    ) -> Result<(), ClientError>;

    async fn close(&self);
}

/// Where a partition reader starts consuming.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StartOffset {
    Oldest,
    /// Only records published after the reader was opened.
    #[default]
    Newest,
}

/// Ordered record stream of a single topic partition.
#[async_trait]
pub trait PartitionReader: Send + 'static {
    /// Next envelope, `None` once the partition stream is closed.
    async fn next(&mut self) -> Result<Option<Envelope>, ClientError>;
}

/// Event-log broker.
#[async_trait]
pub trait BrokerClient: Send + Sync + 'static {
    async fn topic_partitions(
        &self,
        topic: &str,
    ) -> Result<HashMap<String, Vec<PartitionId>>, ClientError>;

    async fn open_partition(
        &self,
        topic: &str,
        partition: PartitionId,
        offset: StartOffset,
    ) -> Result<Box<dyn PartitionReader>, ClientError>;

    /// Dedicated writer publishing to `topic` under `key`.
    fn writer(&self, topic: &str, key: &str) -> Result<Arc<dyn DataWriter>, ClientError>;

    async fn close(&self);
}

/// Hands each new job its downstream writer.
pub trait WriterProvider: Send + Sync + 'static {
    fn writer_for(&self, config: &TaskConfig) -> Result<Arc<dyn DataWriter>, ClientError>;
}

impl<F> WriterProvider for F
where
    F: Fn(&TaskConfig) -> Result<Arc<dyn DataWriter>, ClientError> + Send + Sync + 'static,
{
    fn writer_for(&self, config: &TaskConfig) -> Result<Arc<dyn DataWriter>, ClientError> {
        self(config)
    }
}
