//! Sync adapter: turns `fetch` and `submit` into frames, and inbound
//! frames into model updates.
//!
//! The wire carries no correlation id. Every inbound snapshot is the new
//! canonical state: it resolves every operation outstanding when it
//! arrived, after being applied to the model.

use crate::games::tictactoe::{GameState, StatePatch};
use crate::sync::error::{SyncError, SyncErrorKind};
use crate::sync::model::GameModel;
use crate::sync::protocol::{ClientMessage, decode_snapshot};
use crate::sync::transport::{ChannelState, Inbound, Transport, TransportEvent};
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

type Waiter = oneshot::Sender<Result<GameState, SyncError>>;

/// Adapter between a transport and a session's model.
#[derive(Debug)]
pub struct SyncAdapter<T: Transport> {
    transport: Arc<T>,
    model: GameModel,
    pending: Arc<Mutex<Vec<Waiter>>>,
    pump: JoinHandle<()>,
}

impl<T: Transport> SyncAdapter<T> {
    /// Creates an adapter and starts consuming `inbound`.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip_all)]
    pub fn new(transport: T, inbound: Inbound, model: GameModel) -> Self {
        let pending = Arc::new(Mutex::new(Vec::new()));
        let pump = tokio::spawn(Self::pump(inbound, model.clone(), Arc::clone(&pending)));
        Self {
            transport: Arc::new(transport),
            model,
            pending,
            pump,
        }
    }

    /// The model this adapter feeds.
    pub fn model(&self) -> &GameModel {
        &self.model
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Requests the current state and resolves with the next snapshot.
    #[instrument(skip(self))]
    pub async fn fetch_state(&self, session_id: &str) -> Result<GameState, SyncError> {
        let frame = ClientMessage::Read(session_id.to_string()).encode()?;
        self.exchange(frame).await
    }

    /// Proposes a mutation and resolves with the next snapshot.
    ///
    /// The reply may show the proposal accepted, rejected and unchanged,
    /// or corrected; in every case it has already replaced the mirror.
    #[instrument(skip(self, patch))]
    pub async fn submit_mutation(
        &self,
        session_id: &str,
        patch: StatePatch,
    ) -> Result<GameState, SyncError> {
        let frame = ClientMessage::Update(patch).encode()?;
        self.exchange(frame).await
    }

    async fn exchange(&self, frame: String) -> Result<GameState, SyncError> {
        // Checked before registering so a refused send leaves no waiter.
        if self.transport.state() != ChannelState::Open {
            return Err(SyncError::not_connected());
        }

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.retain(|waiter| !waiter.is_closed());
            pending.push(tx);
        }

        self.transport.send(frame).await?;

        rx.await.map_err(|_| {
            SyncError::new(SyncErrorKind::ConnectionLost(
                "adapter stopped before a reply arrived".to_string(),
            ))
        })?
    }

    async fn pump(mut inbound: Inbound, model: GameModel, pending: Arc<Mutex<Vec<Waiter>>>) {
        let mut last_error = None;

        while let Some(event) = inbound.recv().await {
            match event {
                TransportEvent::Open => info!("Channel open"),
                TransportEvent::Message(text) => {
                    // Only operations issued before this frame arrived resolve with it.
                    let waiters = std::mem::take(&mut *pending.lock().await);
                    let result = decode_snapshot(&text);
                    match &result {
                        Ok(state) => {
                            let changed = model.apply_remote(state.clone());
                            debug!(changed = changed.len(), "Applied canonical snapshot");
                        }
                        Err(e) => warn!(error = %e, "Discarding malformed frame"),
                    }

                    for waiter in waiters {
                        let _ = waiter.send(result.clone());
                    }
                }
                TransportEvent::Error(reason) => {
                    error!(%reason, "Channel error");
                    last_error = Some(reason);
                }
                TransportEvent::Closed => {
                    let reason = last_error.take().unwrap_or_else(|| "channel closed".to_string());
                    model.notify_connection_lost(reason);
                    break;
                }
            }
        }

        // Outstanding operations stay unresolved; there is no replay.
        info!("Inbound pump stopped");
    }
}

impl<T: Transport> Drop for SyncAdapter<T> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
