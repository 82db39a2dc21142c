//! Terminal client: joins a session and plays from stdin.

use crate::config::ClientConfig;
use crate::games::tictactoe::{CellId, GameState, Mark};
use crate::notice::Notice;
use crate::sync::{
    GameModel, ModelEvent, MoveController, MoveError, SyncAdapter, Transport, WsTransport,
};
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, instrument, warn};

/// Connects to the configured session and plays until the game ends,
/// stdin closes, or the connection is lost.
#[instrument(skip(config))]
pub async fn play(config: &ClientConfig) -> Result<()> {
    let session_id = config
        .session_id()
        .clone()
        .ok_or_else(|| anyhow!("No session id given (use --session or the config file)"))?;
    let role = config
        .role()
        .ok_or_else(|| anyhow!("No role given (use --role or the config file)"))?;
    let mark = role.mark();

    let url = config.socket_url(&session_id);
    info!(%url, %role, "Joining session");

    let (transport, inbound) = WsTransport::connect(url.clone());
    let model = GameModel::new();
    let mut events = model.subscribe();
    let adapter = Arc::new(SyncAdapter::new(transport, inbound, model));

    adapter
        .transport()
        .wait_open()
        .await
        .with_context(|| format!("Could not connect to {url}"))?;
    adapter.fetch_state(&session_id).await?;

    let controller = MoveController::new(session_id, role, Arc::clone(&adapter));
    println!("Playing as {role} ({mark}). Enter a cell such as a0 or c2, or `quit`.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ModelEvent::StateChanged { fields, state }) => {
                    render(&state);
                    for notice in Notice::from_change(&fields, &state, mark) {
                        println!("{notice}");
                    }
                    if state.is_finished() {
                        return Ok(());
                    }
                }
                Ok(ModelEvent::Changed(_)) => {}
                Ok(ModelEvent::ConnectionLost(reason)) => {
                    return Err(anyhow!("Connection to the game was lost: {reason}"));
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed model events"),
                Err(RecvError::Closed) => return Ok(()),
            },
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(()) };
                let input = line.trim();
                match input {
                    "" => continue,
                    "quit" => return Ok(()),
                    cell => propose(&controller, cell, mark).await?,
                }
            }
        }
    }
}

async fn propose<T: Transport>(
    controller: &MoveController<T>,
    cell: &str,
    mark: Mark,
) -> Result<()> {
    match controller.propose(CellId::from(cell)).await {
        Ok(state) => {
            if state.coordinates().get(&CellId::from(cell)) != Some(Some(mark)) {
                println!("The server did not accept that move.");
            }
            Ok(())
        }
        Err(MoveError::Invalid(reason)) => {
            println!("{reason}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn render(state: &GameState) {
    println!("\n{}\n", state.coordinates().display());
}
