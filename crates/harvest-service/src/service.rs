use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use harvest_core::{
    BrokerClient, CoordinationClient, JobCache, JobFactory, TaskDispatcher, host_name,
    partition_listener, supervise,
};
use harvest_heartbeat::report;
use taskvisor::TaskError;
use tokio::sync::Mutex;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, instrument, warn};

use crate::{config::ServiceConfig, connector::ClientConnector, errors::ServiceError};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle of a [`CollectService`]: `Idle -> Running -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    Running,
    Stopped,
}

struct Running {
    token: CancellationToken,
    /// Partition listeners and the heartbeat reporter.
    loops: TaskTracker,
    /// Job callbacks scheduled by the dispatcher.
    callbacks: TaskTracker,
}

pub struct CollectService {
    config: ServiceConfig,
    host: String,
    factory: Arc<JobFactory>,
    cache: Arc<JobCache>,
    broker: Arc<dyn BrokerClient>,
    coordination: Arc<dyn CoordinationClient>,
    state: AtomicU8,
    running: Mutex<Option<Running>>,
}

impl CollectService {
    /// Service over already connected clients.
    ///
    /// Fails when the configuration is invalid or the host identity cannot be resolved.
    pub fn new(
        config: ServiceConfig,
        factory: Arc<JobFactory>,
        broker: Arc<dyn BrokerClient>,
        coordination: Arc<dyn CoordinationClient>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        let host = match &config.host {
            Some(host) => host.trim().to_string(),
            None => host_name().map_err(ServiceError::Host)?,
        };

        Ok(Self {
            config,
            host,
            factory,
            cache: Arc::new(JobCache::new()),
            broker,
            coordination,
            state: AtomicU8::new(IDLE),
            running: Mutex::new(None),
        })
    }

    /// Connect the clients through `connector`, then build the service.
    pub async fn connect(
        config: ServiceConfig,
        factory: Arc<JobFactory>,
        connector: &dyn ClientConnector,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        let broker = connector.broker(&config).await?;
        let coordination = match connector.coordination(&config).await {
            Ok(client) => client,
            Err(e) => {
                broker.close().await;
                return Err(e.into());
            }
        };
        Self::new(config, factory, broker, coordination)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn factory(&self) -> &Arc<JobFactory> {
        &self.factory
    }

    pub fn cache(&self) -> &Arc<JobCache> {
        &self.cache
    }

    pub fn state(&self) -> ServiceState {
        match self.state.load(Ordering::Acquire) {
            IDLE => ServiceState::Idle,
            RUNNING => ServiceState::Running,
            _ => ServiceState::Stopped,
        }
    }

    /// Spawn one listener per task-topic partition and the heartbeat reporter.
    ///
    /// Each loop is supervised: retryable failures restart it with backoff.
    ///
    /// Starting a running service is a no-op; a stopped service cannot restart.
    #[instrument(level = "info", skip(self), fields(host = %self.host))]
    pub async fn start(&self) -> Result<(), ServiceError> {
        let mut running = self.running.lock().await;
        match self.state.load(Ordering::Acquire) {
            RUNNING => {
                debug!("service already running");
                return Ok(());
            }
            STOPPED => return Err(ServiceError::Closed),
            _ => {}
        }

        let topic = &self.config.task_topic;
        let partitions = self
            .broker
            .topic_partitions(topic)
            .await?
            .remove(topic)
            .unwrap_or_default();
        if partitions.is_empty() {
            return Err(ServiceError::NoPartitions(topic.clone()));
        }
        let heartbeat = self.config.heartbeat_config(&self.host);
        heartbeat.validate()?;

        let backoff = self.config.restart_backoff();
        let token = CancellationToken::new();
        let loops = TaskTracker::new();
        let callbacks = TaskTracker::new();
        let dispatcher = TaskDispatcher::new(
            self.host.clone(),
            Arc::clone(&self.factory),
            Arc::clone(&self.cache),
            callbacks.clone(),
        );

        for &partition in &partitions {
            let listener = partition_listener(
                topic.clone(),
                partition,
                Arc::clone(&self.broker),
                dispatcher.clone(),
            );
            loops.spawn(watch(
                "partition-listener",
                supervise(listener, backoff, token.child_token()),
            ));
        }

        let reporter = report(
            heartbeat,
            Arc::clone(&self.factory),
            Arc::clone(&self.coordination),
            Arc::clone(&self.broker),
        );
        loops.spawn(watch(
            "heartbeat",
            supervise(reporter, backoff, token.child_token()),
        ));

        *running = Some(Running {
            token,
            loops,
            callbacks,
        });
        self.state.store(RUNNING, Ordering::Release);
        info!(topic = %topic, partitions = ?partitions, "collect service started");
        Ok(())
    }

    /// Cancel every loop, wait for in-flight callbacks, stop all jobs and close the clients.
    ///
    /// Idempotent; clients are closed exactly once.
    #[instrument(level = "info", skip(self), fields(host = %self.host))]
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if self.state.swap(STOPPED, Ordering::AcqRel) == STOPPED {
            debug!("service already stopped");
            return;
        }

        if let Some(run) = running.take() {
            run.token.cancel();
            run.loops.close();
            run.loops.wait().await;
            run.callbacks.close();
            run.callbacks.wait().await;
        }

        let jobs = self.cache.drain().await;
        let stopped = jobs.len();
        for job in jobs {
            job.stop().await;
        }

        self.factory.close_clients();
        self.broker.close().await;
        self.coordination.close().await;
        info!(jobs = stopped, "collect service stopped");
    }
}

async fn watch<F>(slot: &'static str, task: F)
where
    F: Future<Output = Result<(), TaskError>>,
{
    match task.await {
        Ok(()) => debug!(slot, "task finished"),
        Err(TaskError::Canceled) => debug!(slot, "task canceled"),
        Err(TaskError::Fatal { reason, .. }) => error!(slot, %reason, "task failed fatally"),
        Err(e) => warn!(slot, error = ?e, "task failed"),
    }
}
