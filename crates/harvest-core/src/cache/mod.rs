use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::job::JobRef;

type Slot = Arc<OnceCell<JobRef>>;

/// Live jobs indexed by task identity.
///
/// Shared by every partition worker. Each identity owns a once-cell: the job is
/// created and started inside it, so a second sighting of the same task waits
/// for a started job while other tasks are dispatched independently.
#[derive(Default)]
pub struct JobCache {
    jobs: Mutex<HashMap<String, Slot>>,
}

/// Result of a cache lookup.
pub enum Lookup {
    /// The task was already known.
    Cached(JobRef),
    /// A new job was created and started.
    Created(JobRef),
}

impl Lookup {
    pub fn job(&self) -> &JobRef {
        match self {
            Lookup::Cached(job) | Lookup::Created(job) => job,
        }
    }

    pub fn into_job(self) -> JobRef {
        match self {
            Lookup::Cached(job) | Lookup::Created(job) => job,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Lookup::Created(_))
    }
}

impl JobCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached job for `identity`, or create and start one with `create`.
    ///
    /// `None` when the task was unknown and `create` produced nothing.
    pub async fn get_or_create<F>(&self, identity: &str, create: F) -> Option<Lookup>
    where
        F: FnOnce() -> Option<JobRef>,
    {
        let slot = {
            let mut jobs = self.jobs.lock().await;
            Arc::clone(jobs.entry(identity.to_string()).or_default())
        };

        let mut created = false;
        let flag = &mut created;
        let init = slot
            .get_or_try_init(|| async move {
                let job = create().ok_or(())?;
                job.start().await;
                *flag = true;
                Ok::<_, ()>(job)
            })
            .await;

        match init {
            Ok(job) if created => {
                info!(task = identity, "job created and started");
                Some(Lookup::Created(job.clone()))
            }
            Ok(job) => {
                debug!(task = identity, "use cached job");
                Some(Lookup::Cached(job.clone()))
            }
            Err(()) => {
                let mut jobs = self.jobs.lock().await;
                if jobs
                    .get(identity)
                    .is_some_and(|s| Arc::ptr_eq(s, &slot) && !s.initialized())
                {
                    jobs.remove(identity);
                }
                None
            }
        }
    }

    pub async fn get(&self, identity: &str) -> Option<JobRef> {
        self.jobs
            .lock()
            .await
            .get(identity)
            .and_then(|slot| slot.get().cloned())
    }

    pub async fn len(&self) -> usize {
        self.jobs
            .lock()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every job from the cache and hand them back.
    pub async fn drain(&self) -> Vec<JobRef> {
        self.jobs
            .lock()
            .await
            .drain()
            .filter_map(|(_, slot)| slot.get().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{error::CoreError, job::Job};

    #[derive(Default)]
    struct CountingJob {
        started: AtomicUsize,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &str {
            "counting"
        }
        async fn start(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        async fn stop(&self) {}
        async fn callback(&self) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn second_lookup_hits_cache() {
        let cache = JobCache::new();
        let job = Arc::new(CountingJob::default());
        let built = AtomicUsize::new(0);

        for _ in 0..2 {
            let job = job.clone();
            cache
                .get_or_create("t1", || {
                    built.fetch_add(1, Ordering::SeqCst);
                    Some(job as JobRef)
                })
                .await
                .expect("job");
        }

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(job.started.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn failed_creation_is_not_cached() {
        let cache = JobCache::new();
        assert!(cache.get_or_create("t1", || None).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn drain_empties_cache() {
        let cache = JobCache::new();
        let job: JobRef = Arc::new(CountingJob::default());
        cache.get_or_create("t1", || Some(job)).await;

        assert_eq!(cache.drain().await.len(), 1);
        assert!(cache.get("t1").await.is_none());
    }

    struct SlowJob {
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl Job for SlowJob {
        fn name(&self) -> &str {
            "slow"
        }
        async fn start(&self) {
            self.release.notified().await;
        }
        async fn stop(&self) {}
        async fn callback(&self) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_start_does_not_block_other_tasks() {
        let cache = Arc::new(JobCache::new());
        let slow = Arc::new(SlowJob {
            release: tokio::sync::Notify::new(),
        });

        let pending = {
            let cache = cache.clone();
            let job: JobRef = slow.clone();
            tokio::spawn(async move { cache.get_or_create("slow", || Some(job)).await })
        };
        tokio::task::yield_now().await;

        let fast: JobRef = Arc::new(CountingJob::default());
        let lookup = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            cache.get_or_create("fast", || Some(fast)),
        )
        .await
        .expect("independent task blocked")
        .expect("job");
        assert!(lookup.is_created());

        slow.release.notify_one();
        let lookup = pending.await.unwrap().expect("job");
        assert!(lookup.is_created());
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn concurrent_sightings_start_one_job() {
        let cache = Arc::new(JobCache::new());
        let job = Arc::new(CountingJob::default());
        let built = Arc::new(AtomicUsize::new(0));

        let lookups: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let job = job.clone();
                let built = built.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_create("t1", move || {
                            built.fetch_add(1, Ordering::SeqCst);
                            Some(job as JobRef)
                        })
                        .await
                })
            })
            .collect();
        for lookup in lookups {
            assert!(lookup.await.unwrap().is_some());
        }

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(job.started.load(Ordering::SeqCst), 1);
    }
}
