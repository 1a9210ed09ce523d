use std::{
    collections::BTreeMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;

use crate::{client::CoordinationClient, error::ClientError};

/// A node stored by [`MemoryCoordination`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub payload: Vec<u8>,
    pub ephemeral: bool,
}

/// Coordination service kept in a sorted map of paths.
///
/// Ephemeral nodes vanish on [`CoordinationClient::close`], like a session ending.
#[derive(Debug, Default)]
pub struct MemoryCoordination {
    nodes: Mutex<BTreeMap<String, Node>>,
    closed: AtomicBool,
}

impl MemoryCoordination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, path: &str) -> Option<Node> {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Paths under `prefix`, sorted.
    pub fn paths(&self, prefix: &str) -> Vec<String> {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoordinationClient for MemoryCoordination {
    async fn create_node(
        &self,
        path: &str,
        payload: Vec<u8>,
        ephemeral: bool,
        overwrite: bool,
    ) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        let mut nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        if !overwrite && nodes.contains_key(path) {
            return Err(ClientError::AlreadyExists(path.to_string()));
        }
        nodes.insert(path.to_string(), Node { payload, ephemeral });
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, node| !node.ephemeral);
    }
}
