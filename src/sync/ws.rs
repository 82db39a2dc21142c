//! WebSocket transport built on tokio-tungstenite.

use crate::sync::error::{SyncError, SyncErrorKind};
use crate::sync::transport::{ChannelState, Inbound, StateCell, Transport, TransportEvent};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

/// Client side of a WebSocket duplex channel.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
    state: StateCell,
    outbound: mpsc::UnboundedSender<String>,
}

impl WsTransport {
    /// Starts connecting to `url` and returns immediately.
    ///
    /// The handshake runs on a spawned task; [`TransportEvent::Open`]
    /// arrives on the returned stream once it completes. Must be called
    /// from within a tokio runtime.
    #[instrument(skip_all)]
    pub fn connect(url: impl Into<String>) -> (Self, Inbound) {
        let url = url.into();
        let state = StateCell::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        info!(%url, "Connecting WebSocket");
        tokio::spawn(Self::run(url.clone(), state.clone(), outbound_rx, event_tx));

        (
            Self {
                url,
                state,
                outbound: outbound_tx,
            },
            event_rx,
        )
    }

    /// URL this transport connects to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn run(
        url: String,
        state: StateCell,
        mut outbound: mpsc::UnboundedReceiver<String>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let ws_stream = match connect_async(url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!(error = %e, url = %url, "WebSocket handshake failed");
                state.set(ChannelState::Closed);
                let _ = events.send(TransportEvent::Error(e.to_string()));
                let _ = events.send(TransportEvent::Closed);
                return;
            }
        };

        info!(url = %url, "WebSocket opened");
        state.set(ChannelState::Open);
        let _ = events.send(TransportEvent::Open);

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    let Some(text) = frame else {
                        debug!("All senders dropped; closing");
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    };
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        error!(error = %e, "Failed to write frame");
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break;
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            debug!(payload = %text.as_str(), "Frame received");
                            let _ = events.send(TransportEvent::Message(text.as_str().to_string()));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(?frame, "WebSocket closed by peer");
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(other)) => {
                            warn!(?other, "Ignoring non-text frame");
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket read failed");
                            let _ = events.send(TransportEvent::Error(e.to_string()));
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        state.set(ChannelState::Closed);
        let _ = events.send(TransportEvent::Closed);
        info!(url = %url, "WebSocket connection ended");
    }
}

#[async_trait]
impl Transport for WsTransport {
    #[instrument(skip(self, payload), fields(url = %self.url))]
    async fn send(&self, payload: String) -> Result<(), SyncError> {
        self.state.ensure_open()?;
        debug!(payload = %payload, "Sending frame");
        self.outbound.send(payload).map_err(|_| {
            SyncError::new(SyncErrorKind::ConnectionLost(
                "writer task has stopped".to_string(),
            ))
        })
    }

    fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }
}
