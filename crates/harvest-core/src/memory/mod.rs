//! In-process collaborators.
//!
//! Useful for tests, local runs, and for feeding task records that arrive
//! through some other channel into a [`crate::TaskDispatcher`].

mod broker;
pub use broker::{MemoryBroker, MemoryPartitionReader, MemoryTopicWriter};

mod checkpoint;
pub use checkpoint::{MemoryCheckpointer, NullCheckpointer};

mod coordination;
pub use coordination::{MemoryCoordination, Node};

mod writer;
pub use writer::MemoryWriter;
