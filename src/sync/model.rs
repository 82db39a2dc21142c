//! Game state model: the client's mirror of the canonical state.
//!
//! The mirror only changes through [`GameModel::apply_remote`], which
//! replaces it wholesale with a snapshot from the authoritative side and
//! then publishes one [`ModelEvent::Changed`] per differing field followed
//! by a single [`ModelEvent::StateChanged`].

use crate::games::tictactoe::{
    Board, CellId, Field, GameState, GameStatus, InvariantSet, Mark, TransitionInvariants,
};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

/// Capacity of the event channel; slower subscribers observe `Lagged`.
const EVENT_CAPACITY: usize = 64;

/// A changed field and its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    /// New board.
    Coordinates(Board),
    /// New status.
    Status(GameStatus),
    /// New last mark.
    LastMark(Option<Mark>),
    /// New winner.
    Winner(Option<Mark>),
    /// New winning combination.
    WinningCombination(Option<Vec<CellId>>),
    /// New draw flag.
    Draw(bool),
}

impl FieldChange {
    /// Reads the current value of `field` from `state`.
    pub fn capture(field: Field, state: &GameState) -> Self {
        match field {
            Field::Coordinates => Self::Coordinates(state.coordinates().clone()),
            Field::Status => Self::Status(state.status()),
            Field::LastMark => Self::LastMark(state.last_mark()),
            Field::Winner => Self::Winner(state.winner()),
            Field::WinningCombination => {
                Self::WinningCombination(state.winning_combination().map(<[CellId]>::to_vec))
            }
            Field::Draw => Self::Draw(state.draw()),
        }
    }

    /// Name of the changed field.
    pub fn field(&self) -> Field {
        match self {
            Self::Coordinates(_) => Field::Coordinates,
            Self::Status(_) => Field::Status,
            Self::LastMark(_) => Field::LastMark,
            Self::Winner(_) => Field::Winner,
            Self::WinningCombination(_) => Field::WinningCombination,
            Self::Draw(_) => Field::Draw,
        }
    }
}

/// Notification published by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// One field changed.
    Changed(FieldChange),
    /// Sent once after the field notifications of a snapshot.
    StateChanged {
        /// Fields that changed, in notification order.
        fields: Vec<Field>,
        /// The new mirror.
        state: GameState,
    },
    /// The channel feeding the model is gone; the session is over.
    ConnectionLost(String),
}

/// Handle to a session's mirror. Clones share the same mirror.
#[derive(Debug, Clone)]
pub struct GameModel {
    mirror: Arc<watch::Sender<Option<GameState>>>,
    events: broadcast::Sender<ModelEvent>,
}

impl GameModel {
    /// Creates a model with no snapshot yet.
    #[instrument]
    pub fn new() -> Self {
        let (mirror, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            mirror: Arc::new(mirror),
            events,
        }
    }

    /// Returns a copy of the last canonical snapshot, if any arrived.
    pub fn snapshot(&self) -> Option<GameState> {
        self.mirror.borrow().clone()
    }

    /// Registers a listener for model events.
    pub fn subscribe(&self) -> broadcast::Receiver<ModelEvent> {
        self.events.subscribe()
    }

    /// Watches the mirror itself.
    pub fn watch(&self) -> watch::Receiver<Option<GameState>> {
        self.mirror.subscribe()
    }

    /// Replaces the mirror with a canonical snapshot.
    ///
    /// Returns the fields that changed. The first snapshot counts every
    /// field as changed. Applying an identical snapshot changes nothing
    /// and publishes nothing. Transition invariant violations are logged;
    /// the snapshot is applied regardless, since the canonical state wins.
    #[instrument(skip(self, next), fields(status = %next.status()))]
    pub fn apply_remote(&self, next: GameState) -> Vec<Field> {
        let mut changed = Vec::new();

        self.mirror.send_if_modified(|mirror| {
            changed = match mirror.as_ref() {
                Some(current) => {
                    if let Err(violations) = TransitionInvariants::check_all(current, &next) {
                        for violation in &violations {
                            warn!(%violation, "Canonical snapshot breaks a transition invariant");
                        }
                    }
                    current.changed_fields(&next)
                }
                None => <Field as strum::IntoEnumIterator>::iter().collect(),
            };

            if changed.is_empty() {
                debug!("Snapshot identical to mirror");
                return false;
            }

            for field in &changed {
                let change = FieldChange::capture(*field, &next);
                debug!(%field, "Field changed");
                let _ = self.events.send(ModelEvent::Changed(change));
            }
            let _ = self.events.send(ModelEvent::StateChanged {
                fields: changed.clone(),
                state: next.clone(),
            });

            *mirror = Some(next);
            true
        });

        changed
    }

    /// Publishes that the session's connection is gone.
    #[instrument(skip(self))]
    pub(crate) fn notify_connection_lost(&self, reason: String) {
        info!(%reason, "Session connection lost");
        let _ = self.events.send(ModelEvent::ConnectionLost(reason));
    }
}

impl Default for GameModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::StatePatch;
    use tokio::sync::broadcast::error::TryRecvError;

    fn drain(rx: &mut broadcast::Receiver<ModelEvent>) -> Vec<ModelEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => return events,
                Err(e) => panic!("unexpected receive error: {e:?}"),
            }
        }
    }

    fn opened(state: &GameState, cell: &str) -> GameState {
        let mut board = state.coordinates().clone();
        board.set(&CellId::from(cell), Mark::X);
        state.merged(&StatePatch {
            coordinates: Some(board),
            last_mark: Some(Mark::X),
            status: Some(GameStatus::Active),
        })
    }

    #[test]
    fn test_first_snapshot_changes_every_field() {
        let model = GameModel::new();
        let mut rx = model.subscribe();

        let changed = model.apply_remote(GameState::new());
        assert_eq!(changed.len(), 6);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 7);
        assert!(matches!(events.last(), Some(ModelEvent::StateChanged { .. })));
        assert_eq!(model.snapshot(), Some(GameState::new()));
    }

    #[test]
    fn test_field_events_precede_aggregate() {
        let model = GameModel::new();
        let initial = GameState::new();
        model.apply_remote(initial.clone());
        let mut rx = model.subscribe();

        let next = opened(&initial, "a1");
        model.apply_remote(next.clone());

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                ModelEvent::Changed(FieldChange::Coordinates(next.coordinates().clone())),
                ModelEvent::Changed(FieldChange::Status(GameStatus::Active)),
                ModelEvent::Changed(FieldChange::LastMark(Some(Mark::X))),
                ModelEvent::StateChanged {
                    fields: vec![Field::Coordinates, Field::Status, Field::LastMark],
                    state: next,
                },
            ]
        );
    }

    #[test]
    fn test_apply_remote_is_idempotent() {
        let model = GameModel::new();
        let state = opened(&GameState::new(), "b2");
        model.apply_remote(state.clone());
        let mut rx = model.subscribe();

        let changed = model.apply_remote(state.clone());
        assert!(changed.is_empty());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(model.snapshot(), Some(state));
    }

    #[test]
    fn test_canonical_snapshot_wins_over_invariants() {
        let model = GameModel::new();
        model.apply_remote(opened(&GameState::new(), "a0"));

        // A regressing snapshot is still the canonical state.
        let changed = model.apply_remote(GameState::new());
        assert!(changed.contains(&Field::Status));
        assert_eq!(model.snapshot(), Some(GameState::new()));
    }

    #[test]
    fn test_clones_share_mirror() {
        let model = GameModel::new();
        let other = model.clone();
        model.apply_remote(GameState::new());
        assert_eq!(other.snapshot(), Some(GameState::new()));
    }
}
