//! In-process transport pair.
//!
//! [`MemoryTransport`] behaves like a network channel to its owner, while
//! the matching [`MemoryPeer`] plays the remote end: it opens or closes
//! the channel, delivers inbound frames, and observes every frame sent.

use crate::sync::error::{SyncError, SyncErrorKind};
use crate::sync::transport::{ChannelState, Inbound, StateCell, Transport, TransportEvent};
use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, instrument};

/// Local end of an in-process channel.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    state: StateCell,
    outbound: mpsc::UnboundedSender<String>,
}

/// Remote end of an in-process channel.
#[derive(Debug)]
pub struct MemoryPeer {
    state: StateCell,
    events: mpsc::UnboundedSender<TransportEvent>,
    sent: mpsc::UnboundedReceiver<String>,
}

impl MemoryTransport {
    /// Creates a connecting channel, its inbound stream, and the remote end.
    #[instrument]
    pub fn pair() -> (Self, Inbound, MemoryPeer) {
        let state = StateCell::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let transport = Self {
            state: state.clone(),
            outbound: outbound_tx,
        };
        let peer = MemoryPeer {
            state,
            events: event_tx,
            sent: outbound_rx,
        };
        (transport, event_rx, peer)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    #[instrument(skip(self, payload))]
    async fn send(&self, payload: String) -> Result<(), SyncError> {
        self.state.ensure_open()?;
        debug!(payload = %payload, "Sending frame");
        self.outbound.send(payload).map_err(|_| {
            SyncError::new(SyncErrorKind::ConnectionLost("peer dropped".to_string()))
        })
    }

    fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }
}

impl MemoryPeer {
    /// Opens the channel.
    pub fn open(&self) {
        self.state.set(ChannelState::Open);
        let _ = self.events.send(TransportEvent::Open);
    }

    /// Delivers a text frame to the local end.
    pub fn deliver(&self, text: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Message(text.into()));
    }

    /// Fails the channel with an error, then closes it.
    pub fn fail(&self, reason: impl Into<String>) {
        self.state.set(ChannelState::Closed);
        let _ = self.events.send(TransportEvent::Error(reason.into()));
        let _ = self.events.send(TransportEvent::Closed);
    }

    /// Closes the channel.
    pub fn close(&self) {
        self.state.set(ChannelState::Closed);
        let _ = self.events.send(TransportEvent::Closed);
    }

    /// Waits for the next frame sent by the local end.
    pub async fn recv(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// Takes the next sent frame if one is queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.sent.try_recv().ok()
    }
}
