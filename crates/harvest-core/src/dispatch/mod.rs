//! Routing of task records to jobs.

mod listener;
pub use listener::partition_listener;

use std::sync::Arc;

use harvest_model::{Envelope, KEY_HOST, TaskConfig};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, instrument, trace, warn};

use crate::{cache::JobCache, factory::JobFactory};

/// Turns task envelopes into job callbacks for this worker's host.
///
/// Callbacks run detached on the shared tracker, so a slow job never blocks the
/// partition loop that delivered its task.
#[derive(Clone)]
pub struct TaskDispatcher {
    host: String,
    factory: Arc<JobFactory>,
    cache: Arc<JobCache>,
    tracker: TaskTracker,
}

impl TaskDispatcher {
    pub fn new(
        host: impl Into<String>,
        factory: Arc<JobFactory>,
        cache: Arc<JobCache>,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            host: host.into(),
            factory,
            cache,
            tracker,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Handle one envelope of task records; returns how many callbacks were scheduled.
    #[instrument(level = "debug", skip_all, fields(records = envelope.len()))]
    pub async fn dispatch(&self, envelope: &Envelope) -> usize {
        let Some(host) = envelope.meta(KEY_HOST) else {
            error!("host is missing in task envelope, skipping");
            return 0;
        };
        if host != self.host {
            trace!(target_host = host, "task belongs to another host");
            return 0;
        }

        let mut scheduled = 0;
        for raw in &envelope.raw_data {
            let config = match TaskConfig::from_slice(raw) {
                Ok(config) => config,
                Err(e) => {
                    error!(
                        error = %e,
                        record = %String::from_utf8_lossy(raw),
                        "unexpected task config, skipping"
                    );
                    continue;
                }
            };

            let factory = &self.factory;
            let Some(lookup) = self
                .cache
                .get_or_create(config.identity(), || {
                    factory.create_job(config.app(), &config)
                })
                .await
            else {
                continue;
            };

            let job = lookup.into_job();
            let task = config.identity().to_string();
            debug!(task = %task, app = config.app(), "schedule job callback");
            self.tracker.spawn(async move {
                if let Err(e) = job.callback().await {
                    warn!(task = %task, error = %e, "job callback failed");
                }
            });
            scheduled += 1;
        }
        scheduled
    }
}
