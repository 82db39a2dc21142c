//! Authoritative game sessions.
//!
//! Each session owns the canonical [`GameState`] and a broadcast channel
//! fanning every resulting state out to all connections of the session.

use crate::games::tictactoe::invariants::{Invariant, MonotonicBoardInvariant};
use crate::games::tictactoe::{
    CellId, Contract, GameState, GameStatus, LegalMove, Move, MoveContract, Outcome, StatePatch,
    rules,
};
use crate::sync::SessionId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, instrument, warn};

/// Capacity of each session's broadcast channel.
const UPDATE_CAPACITY: usize = 16;

/// Error returned by session operations.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SessionError {
    /// No session with this id.
    #[display("Session {} not found", _0)]
    NotFound(SessionId),

    /// The update was refused; the canonical state is unchanged.
    #[display("Update rejected: {}", _0)]
    Rejected(String),
}

impl std::error::Error for SessionError {}

/// A game session held by the authoritative side.
#[derive(Debug)]
pub struct GameSession {
    id: SessionId,
    state: GameState,
    updates: broadcast::Sender<GameState>,
}

impl GameSession {
    /// Creates a session with a new game on the standard board.
    #[instrument]
    pub fn new(id: SessionId) -> Self {
        info!(session_id = %id, "Creating new game session");
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            id,
            state: GameState::new(),
            updates,
        }
    }

    /// Session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Registers a connection for state broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<GameState> {
        self.updates.subscribe()
    }

    /// Merges a client proposal into the canonical state.
    ///
    /// The proposal must place exactly one new mark, equal to its
    /// `last_mark`, on a move that is legal against the current state.
    /// An accepted move always leaves the game `active` or, if it
    /// produced a result, `finished` with the outcome recorded.
    #[instrument(skip(self, patch), fields(session_id = %self.id))]
    pub fn apply_update(&mut self, patch: &StatePatch) -> Result<&GameState, SessionError> {
        let before = &self.state;
        let mark = patch
            .last_mark
            .ok_or_else(|| SessionError::Rejected("update carries no last_mark".to_string()))?;

        if patch.status == Some(GameStatus::Finished) {
            return Err(SessionError::Rejected(
                "clients cannot finish a game".to_string(),
            ));
        }

        let proposed = before.merged(patch);
        if !MonotonicBoardInvariant::holds(before, &proposed) {
            return Err(SessionError::Rejected(
                MonotonicBoardInvariant::description().to_string(),
            ));
        }

        let placed: Vec<(&CellId, _)> = proposed
            .coordinates()
            .cells()
            .filter(|(cell, mark)| mark.is_some() && before.coordinates().is_unmarked(cell))
            .collect();

        let cell = match placed.as_slice() {
            [(cell, Some(placed_mark))] if *placed_mark == mark => (*cell).clone(),
            _ => {
                return Err(SessionError::Rejected(format!(
                    "expected exactly one new {mark} mark, found {}",
                    placed.len()
                )));
            }
        };

        if !before.coordinates().contains(&cell) {
            return Err(SessionError::Rejected(format!("cell {cell} is not on the board")));
        }

        LegalMove::check(&Move::new(mark, cell.clone()), before)
            .map_err(|reason| SessionError::Rejected(reason.to_string()))?;

        // The canonical board keeps its full cell set whatever the patch listed.
        let mut coordinates = before.coordinates().clone();
        coordinates.set(&cell, mark);
        let mut next = before.merged(&StatePatch {
            coordinates: Some(coordinates),
            last_mark: Some(mark),
            status: Some(GameStatus::Active),
        });

        match rules::outcome(&next) {
            Some(Outcome::Winner { mark, combination }) => {
                info!(%mark, "Game won");
                next.finish_with_winner(mark, combination);
            }
            Some(Outcome::Draw) => {
                info!("Game drawn");
                next.finish_with_draw();
            }
            None => {}
        }

        MoveContract::post(before, &next).map_err(|violations| {
            let descriptions = violations
                .iter()
                .map(|v| v.description.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            SessionError::Rejected(format!("postcondition failed: {descriptions}"))
        })?;

        info!(%cell, %mark, status = %next.status(), "Move committed");
        self.state = next;
        Ok(&self.state)
    }

    fn broadcast(&self) {
        let receivers = self.updates.send(self.state.clone()).unwrap_or(0);
        debug!(session_id = %self.id, receivers, "Broadcast canonical state");
    }
}

/// Manages all game sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<SessionId, GameSession>>>,
}

impl SessionManager {
    /// Creates an empty session manager.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating session manager");
        Self::default()
    }

    /// Subscribes to a session, creating it if needed.
    ///
    /// Returns the current canonical state and the broadcast receiver.
    #[instrument(skip(self))]
    pub async fn join(&self, id: &str) -> (GameState, broadcast::Receiver<GameState>) {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| GameSession::new(id.to_string()));
        (session.state().clone(), session.subscribe())
    }

    /// Reads the canonical state of a session.
    #[instrument(skip(self))]
    pub async fn read(&self, id: &str) -> Result<GameState, SessionError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(id)
            .map(|session| session.state().clone())
            .ok_or_else(|| {
                debug!(session_id = id, "Session not found");
                SessionError::NotFound(id.to_string())
            })
    }

    /// Merges an update and broadcasts the resulting canonical state.
    ///
    /// A rejected update still broadcasts the unchanged state, so the
    /// proposer always receives a reply.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: &StatePatch) -> Result<GameState, SessionError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        let result = session.apply_update(patch).map(GameState::clone);
        if let Err(e) = &result {
            warn!(session_id = id, error = %e, "Update rejected");
        }
        session.broadcast();
        result
    }

    /// Lists all session ids.
    #[instrument(skip(self))]
    pub async fn list_sessions(&self) -> Vec<SessionId> {
        let sessions = self.sessions.lock().await;
        let ids: Vec<_> = sessions.keys().cloned().collect();
        info!(count = ids.len(), "Listed sessions");
        ids
    }
}
