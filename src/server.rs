//! Reference authoritative server over WebSocket.
//!
//! Each connection to `/game/{session_id}/socket` joins the session's
//! broadcast. A `read` is answered to the requester alone; an `update`
//! is merged and the resulting canonical state goes to every connection
//! of the session, the proposer included.

use crate::config::ServerConfig;
use crate::games::tictactoe::GameState;
use crate::session::SessionManager;
use crate::sync::{ClientMessage, encode_snapshot};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router, body::Body};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument, warn};

/// Builds the HTTP router.
#[instrument(skip(sessions))]
pub fn router(sessions: SessionManager) -> Router {
    Router::new()
        .route("/game/{session_id}/socket", get(socket_handler))
        .route("/game/{session_id}", get(state_handler))
        .with_state(sessions)
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
}

/// Binds the configured address and serves until the process exits.
#[instrument(skip(config), fields(address = %config.bind_address()))]
pub async fn run(config: &ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(address = %listener.local_addr()?, "Game server listening");
    serve(listener, SessionManager::new()).await
}

/// Serves on an already bound listener.
pub async fn serve(listener: TcpListener, sessions: SessionManager) -> anyhow::Result<()> {
    axum::serve(listener, router(sessions)).await?;
    Ok(())
}

/// Binds `127.0.0.1` on an ephemeral port and serves in the background.
#[instrument]
pub async fn spawn_local() -> anyhow::Result<(SocketAddr, SessionManager)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let sessions = SessionManager::new();
    let served = sessions.clone();
    tokio::spawn(async move {
        if let Err(e) = serve(listener, served).await {
            error!(error = %e, "Background server stopped");
        }
    });
    info!(%addr, "Background server started");
    Ok((addr, sessions))
}

async fn state_handler(
    Path(session_id): Path<String>,
    State(sessions): State<SessionManager>,
) -> Result<Json<GameState>, StatusCode> {
    sessions
        .read(&session_id)
        .await
        .map(Json)
        .map_err(|_| StatusCode::NOT_FOUND)
}

async fn socket_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(sessions): State<SessionManager>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, sessions))
}

#[instrument(skip(socket, sessions))]
async fn handle_socket(socket: WebSocket, session_id: String, sessions: SessionManager) {
    info!("WebSocket opened");
    let (_, mut updates) = sessions.join(&session_id).await;
    let (mut sender, mut receiver) = socket.split();

    loop {
        let outgoing = tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_client_message(text.as_str(), &session_id, &sessions).await
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => None,
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket receive failed");
                    break;
                }
            },
            update = updates.recv() => match update {
                Ok(state) => Some(state),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Connection lagged; sending latest state");
                    sessions.read(&session_id).await.ok()
                }
                Err(RecvError::Closed) => break,
            },
        };

        let Some(state) = outgoing else { continue };
        let frame = match encode_snapshot(&state) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to encode state");
                continue;
            }
        };
        if let Err(e) = sender.send(Message::Text(frame.into())).await {
            warn!(error = %e, "WebSocket send failed");
            break;
        }
    }

    info!("WebSocket closed");
}

/// Handles one client frame. Returns a state to send to this connection only.
async fn handle_client_message(
    text: &str,
    session_id: &str,
    sessions: &SessionManager,
) -> Option<GameState> {
    match ClientMessage::decode(text) {
        Ok(ClientMessage::Read(requested)) => {
            if requested != session_id {
                debug!(%requested, "Read names another session; answering for this socket's");
            }
            sessions.read(session_id).await.ok()
        }
        Ok(ClientMessage::Update(patch)) => {
            // The reply arrives through the session broadcast.
            if let Err(e) = sessions.update(session_id, &patch).await {
                debug!(error = %e, "Update not applied");
            }
            None
        }
        Err(e) => {
            warn!(error = %e, "Ignoring unrecognized frame");
            None
        }
    }
}
