// File: testing-framework/src/peer/component.rs
//
// Component Protocol over TCP
//
// The listener accepts one gateway connection per scenario. Each connection
// runs a reader task (framing inbound bytes) and a writer task (draining the
// outbound queue), both aborted when the connection is dropped.

use super::framing::{Frame, StanzaFramer, MAX_PENDING_BYTES};
use super::{PeerChannel, PeerEvent};
use crate::error::PeerError;
use crate::stanza::Stanza;
use async_trait::async_trait;
use log::{debug, trace, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const STREAM_CLOSE: &str = "</stream:stream>";

/// Listening socket the gateway connects to
pub struct ComponentListener {
    listener: TcpListener,
    jid: String,
}

impl ComponentListener {
    /// Bind the component port; `jid` is announced in the stream header
    pub async fn bind(addr: SocketAddr, jid: impl Into<String>) -> Result<Self, PeerError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            jid: jid.into(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, PeerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the gateway to connect
    pub async fn accept(&self, timeout: Duration) -> Result<ComponentConnection, PeerError> {
        let (stream, peer) = tokio::time::timeout(timeout, self.listener.accept())
            .await
            .map_err(|_| PeerError::AcceptTimeout(timeout))??;
        debug!("Component connected from {}", peer);
        Ok(ComponentConnection::start(stream, self.jid.clone()))
    }
}

/// One live component session
pub struct ComponentConnection {
    outgoing: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedReceiver<PeerEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ComponentConnection {
    fn start(stream: TcpStream, jid: String) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();

        let writer = tokio::spawn(write_loop(write_half, outgoing_rx));
        let reader = tokio::spawn(read_loop(read_half, jid, outgoing.clone(), events_tx));

        Self {
            outgoing,
            events,
            reader,
            writer,
        }
    }
}

impl Drop for ComponentConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

#[async_trait]
impl PeerChannel for ComponentConnection {
    fn send(&mut self, stanza: &str) -> Result<(), PeerError> {
        self.outgoing
            .send(stanza.to_string())
            .map_err(|_| PeerError::Closed)
    }

    async fn next_event(&mut self) -> Option<PeerEvent> {
        self.events.recv().await
    }
}

/// Stream header sent in reply to the gateway's
fn stream_header(jid: &str) -> String {
    format!(
        "<?xml version='1.0'?><stream:stream xmlns=\"jabber:component:accept\" \
         xmlns:stream=\"http://etherx.jabber.org/streams\" from=\"{}\" id=\"{:016x}\">",
        jid,
        rand::random::<u64>()
    )
}

async fn write_loop(mut socket: OwnedWriteHalf, mut outgoing: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = outgoing.recv().await {
        trace!("Writing {} bytes to the component", text.len());
        if let Err(e) = socket.write_all(text.as_bytes()).await {
            warn!("Failed to write to the component: {}", e);
            break;
        }
        if let Err(e) = socket.flush().await {
            warn!("Failed to flush the component socket: {}", e);
            break;
        }
    }
}

async fn read_loop(
    mut socket: OwnedReadHalf,
    jid: String,
    outgoing: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedSender<PeerEvent>,
) {
    let mut framer = StanzaFramer::new();
    let mut chunk = vec![0u8; 8192];

    'session: loop {
        let read = match socket.read(&mut chunk).await {
            Ok(0) => {
                debug!("Component closed the connection");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to read from the component: {}", e);
                break;
            }
        };
        framer.push(&chunk[..read]);

        while let Some(frame) = framer.next_frame() {
            match frame {
                Frame::StreamOpen => {
                    if outgoing.send(stream_header(&jid)).is_err() {
                        break 'session;
                    }
                }
                Frame::Stanza(text) => {
                    if events.send(PeerEvent::Stanza(Stanza::new(text))).is_err() {
                        break 'session;
                    }
                }
                Frame::StreamClose => {
                    debug!("Component closed its stream");
                    let _ = outgoing.send(STREAM_CLOSE.to_string());
                    break 'session;
                }
            }
        }

        if framer.pending() > MAX_PENDING_BYTES {
            warn!(
                "Dropping the component session: {} bytes without a complete stanza",
                framer.pending()
            );
            break;
        }
    }

    let _ = events.send(PeerEvent::SessionEnd);
}
