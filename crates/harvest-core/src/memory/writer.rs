use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use harvest_model::Envelope;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{client::DataWriter, error::ClientError};

/// Writer keeping every envelope in memory, optionally mirroring it to a channel.
#[derive(Default)]
pub struct MemoryWriter {
    envelopes: Mutex<Vec<Envelope>>,
    tx: Option<mpsc::UnboundedSender<Envelope>>,
    started: AtomicBool,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer that also forwards each envelope to the returned receiver.
    pub fn with_channel() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = Self {
            tx: Some(tx),
            ..Self::default()
        };
        (writer, rx)
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All raw records written so far, in write order.
    pub fn records(&self) -> Vec<Vec<u8>> {
        self.envelopes()
            .into_iter()
            .flat_map(|e| e.raw_data)
            .collect()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataWriter for MemoryWriter {
    async fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    async fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    async fn write_data(&self, envelope: Envelope) -> Result<(), ClientError> {
        debug!(records = envelope.len(), "memory writer received data");
        if let Some(tx) = &self.tx {
            tx.send(envelope.clone()).map_err(|_| ClientError::Closed)?;
        }
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope);
        Ok(())
    }
}
