//! Move controller: decides locally whether a move is legal, and if so
//! proposes it to the authoritative side.
//!
//! The controller never writes its proposal into the mirror. A move is
//! real only once the canonical echo has been applied by the adapter.

use crate::games::tictactoe::{CellId, GameState, InvalidMove, Move, MoveContract, Role, StatePatch};
use crate::sync::adapter::SyncAdapter;
use crate::sync::error::SyncError;
use crate::sync::protocol::SessionId;
use crate::sync::transport::Transport;
use derive_more::{Display, Error, From};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument, warn};

/// Why a proposal did not go through.
#[derive(Debug, Clone, Display, Error, From)]
pub enum MoveError {
    /// Rejected locally; nothing was sent.
    #[display("Invalid move: {}", _0)]
    Invalid(InvalidMove),

    /// No canonical state has arrived yet; nothing was sent.
    #[display("No game state has been received yet")]
    #[from(ignore)]
    StateUnknown,

    /// Submitting the proposal failed.
    #[display("{}", _0)]
    Sync(SyncError),
}

/// Clears the in-flight flag when a proposal settles or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Turn validator and move proposer for one participant.
#[derive(Debug)]
pub struct MoveController<T: Transport> {
    session_id: SessionId,
    role: Role,
    adapter: Arc<SyncAdapter<T>>,
    in_flight: AtomicBool,
}

impl<T: Transport> MoveController<T> {
    /// Creates a controller for `role` in `session_id`.
    #[instrument(skip(adapter))]
    pub fn new(session_id: SessionId, role: Role, adapter: Arc<SyncAdapter<T>>) -> Self {
        Self {
            session_id,
            role,
            adapter,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The local participant's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The session this controller plays in.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Checks a move against the current mirror and computes its patch.
    ///
    /// Pure local check; never touches the transport.
    #[instrument(skip(self), fields(role = %self.role))]
    pub fn validate(&self, cell: &CellId) -> Result<StatePatch, MoveError> {
        let state = self.adapter.model().snapshot().ok_or(MoveError::StateUnknown)?;
        Ok(Self::validate_against(&state, self.role, cell)?)
    }

    /// Checks a move by `role` against an explicit state.
    pub fn validate_against(
        state: &GameState,
        role: Role,
        cell: &CellId,
    ) -> Result<StatePatch, InvalidMove> {
        MoveContract::proposal(state, &Move::new(role.mark(), cell.clone()))
    }

    /// Validates and proposes a move, resolving with the canonical echo.
    ///
    /// While a proposal awaits its echo, further proposals are rejected
    /// with [`InvalidMove::NotYourTurn`] without contacting the transport.
    /// The echo may not contain the move; it is authoritative either way.
    #[instrument(skip(self), fields(session_id = %self.session_id, role = %self.role))]
    pub async fn propose(&self, cell: CellId) -> Result<GameState, MoveError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(%cell, "Proposal already awaiting its echo");
            return Err(InvalidMove::NotYourTurn.into());
        }
        let _guard = InFlight(&self.in_flight);

        let patch = self.validate(&cell)?;
        info!(%cell, mark = %self.role.mark(), "Proposing move");

        let state = self.adapter.submit_mutation(&self.session_id, patch).await?;

        if state.coordinates().get(&cell) == Some(Some(self.role.mark())) {
            info!(%cell, status = %state.status(), "Move confirmed by canonical state");
        } else {
            warn!(%cell, "Canonical state does not contain the proposed move");
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::{GameStatus, Mark};
    use crate::sync::memory::{MemoryPeer, MemoryTransport};
    use crate::sync::model::GameModel;
    use crate::sync::protocol::encode_snapshot;

    fn controller(
        role: Role,
        state: Option<GameState>,
    ) -> (MoveController<MemoryTransport>, MemoryPeer) {
        let (transport, inbound, peer) = MemoryTransport::pair();
        peer.open();
        let model = GameModel::new();
        if let Some(state) = state {
            model.apply_remote(state);
        }
        let adapter = Arc::new(SyncAdapter::new(transport, inbound, model));
        (MoveController::new("g1".to_string(), role, adapter), peer)
    }

    #[tokio::test]
    async fn test_no_state_yet_is_rejected() {
        let (controller, mut peer) = controller(Role::FirstMover, None);
        let err = controller.propose(CellId::from("a0")).await.unwrap_err();
        assert!(matches!(err, MoveError::StateUnknown));
        assert!(peer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_local_rejection_sends_nothing() {
        let (controller, mut peer) = controller(Role::SecondMover, Some(GameState::new()));
        let err = controller.propose(CellId::from("a0")).await.unwrap_err();
        assert!(matches!(err, MoveError::Invalid(InvalidMove::NotYourOpeningTurn)));
        assert!(peer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_proposal_does_not_touch_mirror_before_echo() {
        let (controller, mut peer) = controller(Role::FirstMover, Some(GameState::new()));
        let controller = Arc::new(controller);

        let proposer = Arc::clone(&controller);
        let pending = tokio::spawn(async move { proposer.propose(CellId::from("b1")).await });

        let frame = peer.recv().await.unwrap();
        assert!(frame.starts_with(r#"{"update":"#));
        // Still the pre-move mirror.
        assert_eq!(controller.adapter.model().snapshot(), Some(GameState::new()));

        // A second proposal while awaiting the echo is refused locally.
        let err = controller.propose(CellId::from("c2")).await.unwrap_err();
        assert!(matches!(err, MoveError::Invalid(InvalidMove::NotYourTurn)));
        assert!(peer.try_recv().is_none());

        // The authoritative side rejects: unchanged state comes back.
        peer.deliver(encode_snapshot(&GameState::new()).unwrap());
        let state = pending.await.unwrap().unwrap();
        assert_eq!(state.status(), GameStatus::New);
        assert_eq!(state.last_mark(), None);

        // The flag is cleared, so the participant may try again.
        assert!(controller.validate(&CellId::from("b1")).is_ok());
    }

    #[test]
    fn test_validate_against_builds_patch() {
        let patch = MoveController::<MemoryTransport>::validate_against(
            &GameState::new(),
            Role::FirstMover,
            &CellId::from("a2"),
        )
        .unwrap();
        assert_eq!(patch.last_mark, Some(Mark::X));
        assert_eq!(patch.status, Some(GameStatus::Active));
    }
}
