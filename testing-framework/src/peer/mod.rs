//! Peer channel: the harness side of the gateway's component connection
//!
//! The gateway connects to the harness as an external component. The peer
//! channel accepts that connection, answers the stream header, and exposes a
//! plain "send text / receive stanza" interface to the run loop.

pub mod component;
pub mod framing;
pub mod memory;

pub use component::{ComponentConnection, ComponentListener};
pub use framing::{Frame, StanzaFramer};
pub use memory::{MemoryPeer, PeerScript};

use crate::error::PeerError;
use crate::stanza::Stanza;
use async_trait::async_trait;

/// What the peer channel reports to the run loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// One complete inbound stanza
    Stanza(Stanza),
    /// The gateway closed its stream or the connection dropped
    SessionEnd,
}

/// Bidirectional stanza channel with the system under test
#[async_trait]
pub trait PeerChannel: Send {
    /// Queue one serialized stanza for transmission, preserving order
    fn send(&mut self, stanza: &str) -> Result<(), PeerError>;

    /// Next inbound event; `None` once the channel is exhausted
    ///
    /// Must be cancel-safe: dropping the future before completion loses no
    /// stanza.
    async fn next_event(&mut self) -> Option<PeerEvent>;
}
