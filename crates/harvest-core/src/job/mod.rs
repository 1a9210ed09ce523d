mod reader;
pub use reader::ReaderJob;

use std::sync::Arc;

use async_trait::async_trait;
use harvest_model::TaskConfig;

use crate::error::CoreError;

/// A running unit of work bound to one task.
///
/// `callback` is invoked once per task sighting on the task topic; a job decides
/// itself what one invocation does (the incremental-poll job polls one page).
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Task identity this job serves.
    fn name(&self) -> &str;

    async fn start(&self);

    async fn stop(&self);

    async fn callback(&self) -> Result<(), CoreError>;
}

pub type JobRef = Arc<dyn Job>;

/// Builds jobs for one application type.
pub trait JobBuilder: Send + Sync + 'static {
    /// Builder name for logs.
    fn name(&self) -> &'static str;

    /// Application type tag this builder serves.
    fn app(&self) -> &str;

    fn build_job(&self, config: &TaskConfig) -> Result<JobRef, CoreError>;

    /// Release clients shared by every job of this builder.
    fn close(&self) {}
}
