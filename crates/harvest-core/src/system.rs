use std::{num::NonZeroUsize, thread};

use crate::error::CoreError;

/// Host identity of this worker; tasks are sharded by it.
pub fn host_name() -> Result<String, CoreError> {
    hostname::get()
        .map_err(|e| CoreError::Host(e.to_string()))?
        .into_string()
        .map_err(|raw| CoreError::Host(format!("host name is not valid utf-8: {raw:?}")))
}

/// Get platform (OS family).
#[inline]
pub fn platform() -> &'static str {
    std::env::consts::OS
}

/// Number of CPUs available to this process.
pub fn cpu_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
