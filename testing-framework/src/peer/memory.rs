//! In-memory peer channel
//!
//! Stands in for the gateway in tests: the test scripts the inbound stanzas
//! through a [`PeerScript`] and inspects what the harness sent.

use super::{PeerChannel, PeerEvent};
use crate::error::PeerError;
use crate::stanza::Stanza;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Harness side of an in-memory session
pub struct MemoryPeer {
    inbound: mpsc::UnboundedReceiver<PeerEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: bool,
}

/// Test side of an in-memory session
#[derive(Clone)]
pub struct PeerScript {
    inbound: mpsc::UnboundedSender<PeerEvent>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl MemoryPeer {
    /// Create a connected pair
    pub fn pair() -> (MemoryPeer, PeerScript) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            MemoryPeer {
                inbound: rx,
                sent: sent.clone(),
                closed: false,
            },
            PeerScript { inbound: tx, sent },
        )
    }
}

#[async_trait]
impl PeerChannel for MemoryPeer {
    fn send(&mut self, stanza: &str) -> Result<(), PeerError> {
        if self.closed {
            return Err(PeerError::Closed);
        }
        self.sent.lock().push(stanza.to_string());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<PeerEvent> {
        let event = self.inbound.recv().await;
        if matches!(event, Some(PeerEvent::SessionEnd)) {
            self.closed = true;
        }
        event
    }
}

impl PeerScript {
    /// Deliver a stanza as if the gateway wrote it
    pub fn stanza(&self, text: &str) {
        let _ = self.inbound.send(PeerEvent::Stanza(Stanza::new(text)));
    }

    /// Close the session
    pub fn end_session(&self) {
        let _ = self.inbound.send(PeerEvent::SessionEnd);
    }

    /// Everything the harness sent so far
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}
