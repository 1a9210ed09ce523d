use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, PoisonError, RwLock},
};

use harvest_model::TaskConfig;
use tracing::{debug, error, instrument};

use crate::{
    error::CoreError,
    job::{JobBuilder, JobRef},
};

/// Creates jobs by application type and remembers which types are active.
#[derive(Default)]
pub struct JobFactory {
    builders: HashMap<String, Arc<dyn JobBuilder>>,
    apps: RwLock<BTreeSet<String>>,
}

impl JobFactory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder under its application type, replacing any previous one.
    pub fn register(&mut self, builder: Arc<dyn JobBuilder>) {
        self.builders.insert(builder.app().to_string(), builder);
    }

    #[inline]
    pub fn with(mut self, builder: Arc<dyn JobBuilder>) -> Self {
        self.register(builder);
        self
    }

    pub fn supports(&self, app: &str) -> bool {
        self.builders.contains_key(app)
    }

    #[instrument(level = "trace", skip(self, config), fields(task = %config.identity()))]
    pub fn build(&self, app: &str, config: &TaskConfig) -> Result<JobRef, CoreError> {
        let builder = self
            .builders
            .get(app)
            .ok_or_else(|| CoreError::UnknownApp(app.to_string()))?;

        let job = builder.build_job(config)?;
        self.apps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(app.to_string());
        debug!(builder = builder.name(), app, "job created");
        Ok(job)
    }

    /// Like [`JobFactory::build`], but configuration errors are logged and yield `None`.
    pub fn create_job(&self, app: &str, config: &TaskConfig) -> Option<JobRef> {
        match self.build(app, config) {
            Ok(job) => Some(job),
            Err(e) => {
                error!(app, task = %config.identity(), error = %e, "failed to create job");
                None
            }
        }
    }

    /// Application types with at least one successfully created job.
    pub fn apps(&self) -> Vec<String> {
        self.apps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Release the clients shared by the registered builders.
    pub fn close_clients(&self) {
        for builder in self.builders.values() {
            builder.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use harvest_model::{KEY_APP, KEY_TASK};

    use super::*;
    use crate::job::Job;

    struct NoopJob(String);

    #[async_trait]
    impl Job for NoopJob {
        fn name(&self) -> &str {
            &self.0
        }
        async fn start(&self) {}
        async fn stop(&self) {}
        async fn callback(&self) -> Result<(), CoreError> {
            Ok(())
        }
    }

    struct TestBuilder {
        app: &'static str,
        fail: bool,
        closed: AtomicUsize,
    }

    impl TestBuilder {
        fn new(app: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                app,
                fail,
                closed: AtomicUsize::new(0),
            })
        }
    }

    impl JobBuilder for TestBuilder {
        fn name(&self) -> &'static str {
            "test"
        }
        fn app(&self) -> &str {
            self.app
        }
        fn build_job(&self, config: &TaskConfig) -> Result<JobRef, CoreError> {
            if self.fail {
                return Err(CoreError::BuilderClosed(self.app.to_string()));
            }
            Ok(Arc::new(NoopJob(config.identity().to_string())))
        }
        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn task(app: &str, id: &str) -> TaskConfig {
        TaskConfig::from_pairs([(KEY_APP, app), (KEY_TASK, id)]).unwrap()
    }

    #[test]
    fn unknown_app_yields_none() {
        let factory = JobFactory::new();
        assert!(factory.create_job("snow", &task("snow", "t1")).is_none());
        assert!(matches!(
            factory.build("snow", &task("snow", "t1")),
            Err(CoreError::UnknownApp(_))
        ));
        assert!(factory.apps().is_empty());
    }

    #[test]
    fn apps_track_only_successful_jobs() {
        let factory = JobFactory::new()
            .with(TestBuilder::new("snow", false))
            .with(TestBuilder::new("broken", true));

        assert!(factory.create_job("snow", &task("snow", "t1")).is_some());
        assert!(factory.create_job("broken", &task("broken", "t2")).is_none());
        assert_eq!(factory.apps(), vec!["snow".to_string()]);
    }

    #[test]
    fn close_clients_reaches_every_builder() {
        let a = TestBuilder::new("a", false);
        let b = TestBuilder::new("b", false);
        let factory = JobFactory::new().with(a.clone()).with(b.clone());

        factory.close_clients();
        assert_eq!(a.closed.load(Ordering::SeqCst), 1);
        assert_eq!(b.closed.load(Ordering::SeqCst), 1);
    }
}
