//! Transport channel: one persistent duplex connection per client.
//!
//! A transport is created in the `Connecting` state together with its
//! inbound event stream. The stream has exactly one consumer, and events
//! arrive on it in the order they came off the wire.

use crate::sync::error::{SyncError, SyncErrorKind};
use async_trait::async_trait;
use derive_more::Display;
use tokio::sync::{mpsc, watch};
use tracing::{debug, instrument};

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChannelState {
    /// Handshake in progress; sends fail.
    #[display("connecting")]
    Connecting,
    /// Open for sending and receiving.
    #[display("open")]
    Open,
    /// Closed or failed. Terminal.
    #[display("closed")]
    Closed,
}

/// Event delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection opened.
    Open,
    /// A text frame arrived.
    Message(String),
    /// The connection failed.
    Error(String),
    /// The connection closed.
    Closed,
}

/// Receiving half of a transport.
pub type Inbound = mpsc::UnboundedReceiver<TransportEvent>;

/// Sending half of a duplex channel.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Enqueues a text frame.
    ///
    /// Fails with [`SyncErrorKind::NotConnected`] unless the channel is open.
    async fn send(&self, payload: String) -> Result<(), SyncError>;

    /// Watches the channel's lifecycle state.
    fn subscribe_state(&self) -> watch::Receiver<ChannelState>;

    /// Current lifecycle state.
    fn state(&self) -> ChannelState {
        *self.subscribe_state().borrow()
    }

    /// Waits until the channel leaves `Connecting`.
    ///
    /// Resolves `Ok` once open; fails if the channel closed instead.
    async fn wait_open(&self) -> Result<(), SyncError> {
        let mut rx = self.subscribe_state();
        let state = *rx
            .wait_for(|state| *state != ChannelState::Connecting)
            .await
            .map_err(|_| {
                SyncError::new(SyncErrorKind::ConnectionLost("channel dropped".to_string()))
            })?;
        debug!(%state, "Channel left connecting state");

        match state {
            ChannelState::Open => Ok(()),
            _ => Err(SyncError::new(SyncErrorKind::ConnectionLost(
                "channel closed before opening".to_string(),
            ))),
        }
    }
}

/// Shared lifecycle cell used by transport implementations.
#[derive(Debug, Clone)]
pub(crate) struct StateCell {
    tx: std::sync::Arc<watch::Sender<ChannelState>>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ChannelState::Connecting);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    #[instrument(skip(self))]
    pub(crate) fn set(&self, state: ChannelState) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            debug!(%previous, %state, "Channel state changed");
        }
    }

    pub(crate) fn get(&self) -> ChannelState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ChannelState> {
        self.tx.subscribe()
    }

    /// Fails with `NotConnected` unless open.
    #[track_caller]
    pub(crate) fn ensure_open(&self) -> Result<(), SyncError> {
        match self.get() {
            ChannelState::Open => Ok(()),
            _ => Err(SyncError::not_connected()),
        }
    }
}
