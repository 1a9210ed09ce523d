use std::sync::{Arc, PoisonError, RwLock};

use harvest_core::{Checkpointer, CoreError, JobBuilder, JobRef, ReaderJob, WriterProvider};
use harvest_model::TaskConfig;
use tracing::{debug, info};

use crate::config::PollConfig;
use crate::error::SourceError;
use crate::poller::{REQUEST_TIMEOUT, SourcePoller};
use crate::reader::IncrementalReader;

const NAME: &str = "incremental-poll";

/// Builds incremental-poll jobs for one application type.
///
/// Every job shares the builder's HTTP client; [`JobBuilder::close`] releases it
/// and later builds fail.
pub struct IncrementalJobBuilder {
    app: String,
    client: RwLock<Option<reqwest::Client>>,
    writers: Arc<dyn WriterProvider>,
    checkpointer: Arc<dyn Checkpointer>,
}

impl IncrementalJobBuilder {
    pub fn new(
        app: impl Into<String>,
        writers: Arc<dyn WriterProvider>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(app, client, writers, checkpointer))
    }

    pub fn with_client(
        app: impl Into<String>,
        client: reqwest::Client,
        writers: Arc<dyn WriterProvider>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        Self {
            app: app.into(),
            client: RwLock::new(Some(client)),
            writers,
            checkpointer,
        }
    }

    fn client(&self) -> Option<reqwest::Client> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl JobBuilder for IncrementalJobBuilder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn app(&self) -> &str {
        &self.app
    }

    fn build_job(&self, config: &TaskConfig) -> Result<JobRef, CoreError> {
        let client = self
            .client()
            .ok_or_else(|| CoreError::BuilderClosed(NAME.to_string()))?;
        let poll = PollConfig::from_task(config)?;
        let writer = self.writers.writer_for(config)?;

        debug!(
            task = %config.identity(),
            endpoint = %poll.endpoint,
            page_size = poll.page_size,
            "building incremental-poll job"
        );
        let poller = SourcePoller::new(client, Arc::new(poll));
        let reader = IncrementalReader::new(
            config.clone(),
            poller,
            writer,
            self.checkpointer.clone(),
        );
        Ok(Arc::new(ReaderJob::new(config.identity(), Arc::new(reader))))
    }

    fn close(&self) {
        if self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            info!(app = %self.app, "incremental-poll client released");
        }
    }
}
