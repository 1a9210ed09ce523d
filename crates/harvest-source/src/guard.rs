use std::sync::atomic::{AtomicBool, Ordering};

/// At-most-one in-flight poll per job.
#[derive(Debug, Default)]
pub struct PollGuard {
    busy: AtomicBool,
}

/// Held for the duration of one poll; releases the guard on drop.
#[derive(Debug)]
pub struct PollPermit<'a> {
    guard: &'a PollGuard,
}

impl PollGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, `None` while another poll holds it.
    pub fn try_begin(&self) -> Option<PollPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PollPermit { guard: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for PollPermit<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}
