//! Orchestration core: collaborator contracts, jobs, the job factory and cache,
//! and the per-partition task dispatch loop.

pub mod error;
pub use error::{ClientError, CoreError};

pub mod client;
pub use client::{
    BrokerClient, Checkpointer, CoordinationClient, DataReader, DataWriter, PartitionReader,
    StartOffset, WriterProvider,
};

pub mod job;
pub use job::{Job, JobBuilder, JobRef, ReaderJob};

pub mod factory;
pub use factory::JobFactory;

pub mod cache;
pub use cache::{JobCache, Lookup};

pub mod dispatch;
pub use dispatch::{TaskDispatcher, partition_listener};

pub mod memory;

mod supervise;
pub use supervise::{restart_backoff, supervise};

mod system;
pub use system::{cpu_count, host_name, platform};
