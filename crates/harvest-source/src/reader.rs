use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use harvest_core::{Checkpointer, CoreError, DataReader, DataWriter};
use harvest_model::{Envelope, KEY_SERVER_URL, KEY_USERNAME, Record, TaskConfig};
use tracing::{debug, info, instrument};

use crate::config::{KEY_ENDPOINT, PollConfig};
use crate::cursor::reconcile;
use crate::error::SourceError;
use crate::guard::PollGuard;
use crate::poller::SourcePoller;
use crate::state::CheckpointCache;

/// Result of one [`IncrementalReader::poll_once`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another poll of the same job was still in flight.
    Skipped,
    Collected {
        emitted: usize,
        refreshed: bool,
    },
}

/// Reader paging through one source feed with a checkpointed cursor.
pub struct IncrementalReader {
    task: TaskConfig,
    poller: SourcePoller,
    writer: Arc<dyn DataWriter>,
    store: Arc<dyn Checkpointer>,
    checkpoints: CheckpointCache,
    guard: PollGuard,
    started: AtomicBool,
}

impl IncrementalReader {
    pub fn new(
        task: TaskConfig,
        poller: SourcePoller,
        writer: Arc<dyn DataWriter>,
        store: Arc<dyn Checkpointer>,
    ) -> Self {
        let checkpoints = CheckpointCache::new(
            store.clone(),
            task.clone(),
            poller.config().next_record_time.clone(),
        );
        Self {
            task,
            poller,
            writer,
            store,
            checkpoints,
            guard: PollGuard::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn task(&self) -> &TaskConfig {
        &self.task
    }

    pub fn checkpoints(&self) -> &CheckpointCache {
        &self.checkpoints
    }

    /// One poll cycle: load the cursor, fetch a page, emit the new records and commit.
    ///
    /// The checkpoint only advances after the write succeeded, except a forced
    /// advance past a saturated timestamp, which is applied in memory first.
    #[instrument(level = "debug", skip(self), fields(task = %self.task.identity()))]
    pub async fn poll_once(&self) -> Result<PollOutcome, SourceError> {
        let Some(_permit) = self.guard.try_begin() else {
            debug!("previous poll still running, skipping");
            return Ok(PollOutcome::Skipped);
        };

        let previous = self.checkpoints.load().await?;
        let page = self.poller.fetch(&previous.next_record_time).await?;
        let config = self.poller.config();
        let reconciled = reconcile(Some(&previous), &page, config.page_size)?;

        if let (true, Some(next)) = (reconciled.refreshed, &reconciled.checkpoint) {
            self.checkpoints.apply(next.clone());
        }

        let emitted = reconciled.emit.len();
        if emitted > 0 {
            let envelope = self.envelope(config, &reconciled.emit);
            self.writer
                .write_data(envelope)
                .await
                .map_err(SourceError::Write)?;
        }

        if let Some(next) = reconciled.checkpoint {
            self.checkpoints.commit(next).await?;
        }

        info!(
            fetched = page.fetched(),
            emitted,
            refreshed = reconciled.refreshed,
            "poll finished"
        );
        Ok(PollOutcome::Collected {
            emitted,
            refreshed: reconciled.refreshed,
        })
    }

    fn envelope(&self, config: &PollConfig, records: &[Record]) -> Envelope {
        let mut envelope = Envelope::default()
            .with_meta(KEY_SERVER_URL, config.server_url.clone())
            .with_meta(KEY_ENDPOINT, config.endpoint.clone());
        if let Some(user) = &config.username {
            envelope = envelope.with_meta(KEY_USERNAME, user.clone());
        }
        for record in records {
            envelope.push(record.render());
        }
        envelope
    }
}

#[async_trait]
impl DataReader for IncrementalReader {
    async fn start(&self) {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.writer.start().await;
            self.store.start().await;
            debug!(task = %self.task.identity(), "reader started");
        }
    }

    async fn stop(&self) {
        if self
            .started
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.store.stop().await;
            self.writer.stop().await;
            debug!(task = %self.task.identity(), "reader stopped");
        }
    }

    async fn index_data(&self) -> Result<(), CoreError> {
        self.poll_once().await?;
        Ok(())
    }
}
