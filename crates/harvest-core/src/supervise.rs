use std::time::Duration;

use taskvisor::{BackoffPolicy, JitterPolicy, TaskError, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Exponential backoff between restarts, from `first` up to `max`.
pub fn restart_backoff(first: Duration, max: Duration) -> BackoffPolicy {
    BackoffPolicy {
        first,
        max,
        factor: 2.0,
        jitter: JitterPolicy::Equal,
    }
}

/// Run `task` until it returns, fails fatally or `token` is cancelled.
///
/// Retryable failures (`Fail`, `Timeout`) restart the task after the next
/// `backoff` delay. An attempt that ends cleanly resets the delay.
pub async fn supervise(
    task: TaskRef,
    backoff: BackoffPolicy,
    token: CancellationToken,
) -> Result<(), TaskError> {
    let mut attempt: u64 = 0;
    let mut prev: Option<Duration> = None;

    loop {
        attempt += 1;
        match task.spawn(token.child_token()).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() && !token.is_cancelled() => {
                let delay = backoff.next(prev);
                warn!(task = task.name(), attempt, error = %e, delay_ms = delay.as_millis() as u64, "task failed, restarting");
                tokio::select! {
                    _ = token.cancelled() => return Err(TaskError::Canceled),
                    _ = tokio::time::sleep(delay) => {}
                }
                prev = Some(delay);
            }
            Err(e) => {
                debug!(task = task.name(), attempt, error = %e, "task exited");
                return Err(e);
            }
        }
    }
}
