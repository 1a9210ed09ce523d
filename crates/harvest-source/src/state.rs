use std::sync::{Arc, Mutex, PoisonError};

use harvest_core::Checkpointer;
use harvest_model::{CollectionState, TaskConfig};
use tracing::{debug, error};

use crate::error::SourceError;

/// In-memory checkpoint of one job, backed by the durable store.
///
/// The cached state is trusted once set; the store is read only while the cache
/// is empty (first poll after the job was built).
pub struct CheckpointCache {
    store: Arc<dyn Checkpointer>,
    task: TaskConfig,
    initial: String,
    cached: Mutex<Option<CollectionState>>,
}

impl CheckpointCache {
    pub fn new(store: Arc<dyn Checkpointer>, task: TaskConfig, initial: impl Into<String>) -> Self {
        Self {
            store,
            task,
            initial: initial.into(),
            cached: Mutex::new(None),
        }
    }

    /// Current checkpoint, loading it from the store when nothing is cached.
    ///
    /// A missing or undecodable stored blob falls back to the configured start time.
    pub async fn load(&self) -> Result<CollectionState, SourceError> {
        if let Some(state) = self.cached().filter(|s| !s.is_empty()) {
            return Ok(state);
        }

        let raw = self
            .store
            .get_checkpoint(&self.task)
            .await
            .map_err(SourceError::Checkpoint)?;

        let state = match raw.filter(|blob| !blob.is_empty()) {
            None => CollectionState::initial(&self.initial),
            Some(blob) => match CollectionState::from_bytes(&blob) {
                Ok(state) if !state.is_empty() => state,
                Ok(_) => CollectionState::initial(&self.initial),
                Err(e) => {
                    error!(
                        task = %self.task.identity(),
                        error = %e,
                        "stored checkpoint is unreadable, starting from configured time"
                    );
                    CollectionState::initial(&self.initial)
                }
            },
        };

        debug!(
            task = %self.task.identity(),
            next_record_time = %state.next_record_time,
            "checkpoint loaded"
        );
        self.set(state.clone());
        Ok(state)
    }

    /// Replace the in-memory state without touching the store.
    pub fn apply(&self, state: CollectionState) {
        self.set(state);
    }

    /// Persist `state`, then make it current.
    pub async fn commit(&self, state: CollectionState) -> Result<(), SourceError> {
        let blob = state.to_bytes().map_err(SourceError::Encode)?;
        self.store
            .write_checkpoint(&self.task, blob)
            .await
            .map_err(SourceError::Checkpoint)?;
        self.set(state);
        Ok(())
    }

    pub fn cached(&self) -> Option<CollectionState> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, state: CollectionState) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(state);
    }
}
