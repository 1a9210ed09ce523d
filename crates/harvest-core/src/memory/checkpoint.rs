use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use harvest_model::TaskConfig;

use crate::{client::Checkpointer, error::ClientError};

/// Checkpointer that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCheckpointer;

#[async_trait]
impl Checkpointer for NullCheckpointer {
    async fn start(&self) {}

    async fn stop(&self) {}

    async fn get_checkpoint(&self, _config: &TaskConfig) -> Result<Option<Vec<u8>>, ClientError> {
        Ok(None)
    }

    async fn write_checkpoint(&self, _config: &TaskConfig, _data: Vec<u8>) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Checkpoints kept in a map keyed by task identity.
#[derive(Debug, Default)]
pub struct MemoryCheckpointer {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a checkpoint for a task identity.
    pub fn insert(&self, identity: impl Into<String>, data: Vec<u8>) {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.into(), data);
    }

    pub fn get(&self, identity: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .cloned()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn start(&self) {}

    async fn stop(&self) {}

    async fn get_checkpoint(&self, config: &TaskConfig) -> Result<Option<Vec<u8>>, ClientError> {
        Ok(self.get(config.identity()))
    }

    async fn write_checkpoint(&self, config: &TaskConfig, data: Vec<u8>) -> Result<(), ClientError> {
        self.insert(config.identity(), data);
        Ok(())
    }
}
