use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::client::DataReader;
use crate::error::CoreError;
use crate::job::Job;

/// Job that drives a [`DataReader`]: every callback indexes one unit of work.
pub struct ReaderJob {
    name: String,
    reader: Arc<dyn DataReader>,
}

impl ReaderJob {
    pub fn new(name: impl Into<String>, reader: Arc<dyn DataReader>) -> Self {
        Self {
            name: name.into(),
            reader,
        }
    }
}

#[async_trait]
impl Job for ReaderJob {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) {
        self.reader.start().await;
    }

    async fn stop(&self) {
        self.reader.stop().await;
    }

    async fn callback(&self) -> Result<(), CoreError> {
        trace!(job = %self.name, "index data");
        self.reader.index_data().await
    }
}
