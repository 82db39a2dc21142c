//! End-to-end sync flow over in-memory transports.
//!
//! The test plays the authoritative side by hand: it reads each update
//! frame, merges it, and delivers the canonical snapshot to both
//! participants.

use std::sync::Arc;
use std::time::Duration;
use strictly_sync::{
    Board, CellId, ClientMessage, Field, GameModel, GameState, GameStatus, InvalidMove, Mark,
    MemoryPeer, MemoryTransport, ModelEvent, MoveController, MoveError, Role, SyncAdapter,
    SyncErrorKind, encode_snapshot,
};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

struct Participant {
    adapter: Arc<SyncAdapter<MemoryTransport>>,
    controller: Arc<MoveController<MemoryTransport>>,
    peer: MemoryPeer,
}

fn participant(role: Role, initial: &GameState) -> Participant {
    let (transport, inbound, peer) = MemoryTransport::pair();
    peer.open();
    let model = GameModel::new();
    model.apply_remote(initial.clone());
    let adapter = Arc::new(SyncAdapter::new(transport, inbound, model));
    let controller = Arc::new(MoveController::new(
        "g1".to_string(),
        role,
        Arc::clone(&adapter),
    ));
    Participant {
        adapter,
        controller,
        peer,
    }
}

fn custom_board() -> Board {
    Board::with_cells(
        ["A1", "A2", "A3", "B1", "B2", "B3", "C1", "C2", "C3"].map(CellId::from),
    )
}

/// Reads the next update from `proposer`, merges it into `canonical`,
/// and delivers the result to every peer.
async fn authority_round(
    canonical: &GameState,
    proposer: &mut MemoryPeer,
    peers: &[&MemoryPeer],
) -> GameState {
    let frame = timeout(WAIT, proposer.recv())
        .await
        .expect("update frame should arrive")
        .expect("channel should be open");
    let ClientMessage::Update(patch) = ClientMessage::decode(&frame).unwrap() else {
        panic!("Expected an update frame, got {frame}");
    };
    let next = canonical.merged(&patch);
    let echo = encode_snapshot(&next).unwrap();
    proposer.deliver(echo.clone());
    for peer in peers {
        peer.deliver(echo.clone());
    }
    next
}

#[tokio::test]
async fn test_two_participants_on_custom_board() {
    let initial = GameState::with_board(custom_board());
    let mut first = participant(Role::FirstMover, &initial);
    let mut second = participant(Role::SecondMover, &initial);
    let mut first_events = first.adapter.model().subscribe();

    // First mover opens on A1.
    let controller = Arc::clone(&first.controller);
    let proposal = tokio::spawn(async move { controller.propose(CellId::from("A1")).await });

    let frame = timeout(WAIT, first.peer.recv()).await.unwrap().unwrap();
    let ClientMessage::Update(patch) = ClientMessage::decode(&frame).unwrap() else {
        panic!("Expected an update frame");
    };
    assert_eq!(patch.last_mark, Some(Mark::X));
    assert_eq!(patch.status, Some(GameStatus::Active));
    let board = patch.coordinates.clone().unwrap();
    assert_eq!(board.get(&CellId::from("A1")), Some(Some(Mark::X)));
    assert_eq!(board.cells_marked(Mark::X).count(), 1);

    // The proposal is not applied until the echo arrives.
    assert_eq!(first.adapter.model().snapshot(), Some(initial.clone()));

    let canonical = initial.merged(&patch);
    let echo = encode_snapshot(&canonical).unwrap();
    first.peer.deliver(echo.clone());
    second.peer.deliver(echo);

    let confirmed = timeout(WAIT, proposal).await.unwrap().unwrap().unwrap();
    assert_eq!(confirmed, canonical);
    assert_eq!(first.adapter.model().snapshot(), Some(canonical.clone()));

    let mut notified = Vec::new();
    loop {
        match timeout(WAIT, first_events.recv()).await.unwrap().unwrap() {
            ModelEvent::Changed(change) => notified.push(change.field()),
            ModelEvent::StateChanged { fields, state } => {
                assert_eq!(fields, notified);
                assert_eq!(state, canonical);
                break;
            }
            other => panic!("Unexpected event {other:?}"),
        }
    }
    assert_eq!(notified, vec![Field::Coordinates, Field::Status, Field::LastMark]);

    // Second mover sees the move and cannot take A1.
    let mut mirror = second.adapter.model().watch();
    timeout(WAIT, mirror.wait_for(|state| state.as_ref() == Some(&canonical)))
        .await
        .unwrap()
        .unwrap();

    let result = second.controller.propose(CellId::from("A1")).await;
    assert!(matches!(result, Err(MoveError::Invalid(InvalidMove::CellOccupied(_)))));
    assert!(second.peer.try_recv().is_none());

    // Another cell goes through.
    let controller = Arc::clone(&second.controller);
    let proposal = tokio::spawn(async move { controller.propose(CellId::from("B2")).await });
    let canonical = authority_round(&canonical, &mut second.peer, &[&first.peer]).await;

    let confirmed = timeout(WAIT, proposal).await.unwrap().unwrap().unwrap();
    assert_eq!(confirmed.coordinates().get(&CellId::from("B2")), Some(Some(Mark::O)));
    assert_eq!(confirmed.last_mark(), Some(Mark::O));
    assert_eq!(confirmed, canonical);
}

#[tokio::test]
async fn test_sparse_echo_leaves_unlisted_cells_playable() {
    let initial = GameState::with_board(custom_board());
    let mut first = participant(Role::FirstMover, &initial);
    let mut second = participant(Role::SecondMover, &initial);
    let mut first_events = first.adapter.model().subscribe();

    let controller = Arc::clone(&first.controller);
    let proposal = tokio::spawn(async move { controller.propose(CellId::from("A1")).await });

    let frame = timeout(WAIT, first.peer.recv()).await.unwrap().unwrap();
    assert!(frame.starts_with(r#"{"update":{"coordinates":{"A1":"X","#));
    assert!(frame.ends_with(r#""last_mark":"X","status":2}}"#));

    // The authority echoes only the marked cell.
    let echo = r#"{
        "coordinates": {"A1":"X"}, "status":2, "last_mark":"X", "winner":null, "draw":false
    }"#;
    first.peer.deliver(echo);
    second.peer.deliver(echo);

    let confirmed = timeout(WAIT, proposal).await.unwrap().unwrap().unwrap();
    assert_eq!(confirmed.coordinates().cells().count(), 1);

    let mut notified = Vec::new();
    loop {
        match timeout(WAIT, first_events.recv()).await.unwrap().unwrap() {
            ModelEvent::Changed(change) => notified.push(change.field()),
            ModelEvent::StateChanged { .. } => break,
            other => panic!("Unexpected event {other:?}"),
        }
    }
    assert_eq!(notified, vec![Field::Coordinates, Field::Status, Field::LastMark]);

    let mut mirror = second.adapter.model().watch();
    timeout(WAIT, mirror.wait_for(|state| state.as_ref() == Some(&confirmed)))
        .await
        .unwrap()
        .unwrap();

    let result = second.controller.propose(CellId::from("A1")).await;
    assert!(matches!(result, Err(MoveError::Invalid(InvalidMove::CellOccupied(_)))));
    assert!(second.peer.try_recv().is_none());

    let controller = Arc::clone(&second.controller);
    let proposal = tokio::spawn(async move { controller.propose(CellId::from("B2")).await });
    let canonical = authority_round(&confirmed, &mut second.peer, &[&first.peer]).await;

    let accepted = timeout(WAIT, proposal).await.unwrap().unwrap().unwrap();
    assert_eq!(accepted, canonical);
    assert_eq!(accepted.coordinates().mark_at(&CellId::from("A1")), Some(Mark::X));
    assert_eq!(accepted.coordinates().mark_at(&CellId::from("B2")), Some(Mark::O));
}

#[tokio::test]
async fn test_accepted_move_blocks_same_mark_without_transport() {
    let initial = GameState::new();
    let mut first = participant(Role::FirstMover, &initial);

    let controller = Arc::clone(&first.controller);
    let proposal = tokio::spawn(async move { controller.propose(CellId::from("b1")).await });
    authority_round(&initial, &mut first.peer, &[]).await;
    timeout(WAIT, proposal).await.unwrap().unwrap().unwrap();

    let result = first.controller.propose(CellId::from("c2")).await;
    assert!(matches!(result, Err(MoveError::Invalid(InvalidMove::NotYourTurn))));
    assert!(first.peer.try_recv().is_none());
}

#[tokio::test]
async fn test_second_proposal_while_in_flight_is_rejected() {
    let initial = GameState::new();
    let mut first = participant(Role::FirstMover, &initial);

    let controller = Arc::clone(&first.controller);
    let proposal = tokio::spawn(async move { controller.propose(CellId::from("b1")).await });
    let frame = timeout(WAIT, first.peer.recv()).await.unwrap().unwrap();
    assert!(frame.starts_with(r#"{"update""#));

    let result = first.controller.propose(CellId::from("a0")).await;
    assert!(matches!(result, Err(MoveError::Invalid(InvalidMove::NotYourTurn))));
    assert!(first.peer.try_recv().is_none());

    // Let the first proposal settle.
    let ClientMessage::Update(patch) = ClientMessage::decode(&frame).unwrap() else {
        panic!("Expected an update frame");
    };
    first
        .peer
        .deliver(encode_snapshot(&initial.merged(&patch)).unwrap());
    timeout(WAIT, proposal).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_rejected_echo_overrides_local_guess() {
    let initial = GameState::new();
    let mut first = participant(Role::FirstMover, &initial);

    let controller = Arc::clone(&first.controller);
    let proposal = tokio::spawn(async move { controller.propose(CellId::from("b1")).await });
    timeout(WAIT, first.peer.recv()).await.unwrap().unwrap();

    // The authority refuses and answers with the unchanged state.
    first.peer.deliver(encode_snapshot(&initial).unwrap());

    let state = timeout(WAIT, proposal).await.unwrap().unwrap().unwrap();
    assert_eq!(state, initial);
    assert_eq!(first.adapter.model().snapshot(), Some(initial));
}

#[tokio::test]
async fn test_repeated_snapshot_is_idempotent() {
    let initial = GameState::new();
    let first = participant(Role::FirstMover, &initial);
    let mut events = first.adapter.model().subscribe();

    let changed = first.adapter.model().apply_remote(initial.clone());
    assert!(changed.is_empty());
    assert_eq!(first.adapter.model().snapshot(), Some(initial));
    assert!(events.try_recv().is_err(), "No events for an identical snapshot");
}

#[tokio::test]
async fn test_every_inbound_snapshot_replaces_mirror() {
    let initial = GameState::new();
    let first = participant(Role::FirstMover, &initial);
    let after_x = initial.merged(
        &MoveController::<MemoryTransport>::validate_against(
            &initial,
            Role::FirstMover,
            &CellId::from("a0"),
        )
        .unwrap(),
    );
    let after_o = after_x.merged(
        &MoveController::<MemoryTransport>::validate_against(
            &after_x,
            Role::SecondMover,
            &CellId::from("c2"),
        )
        .unwrap(),
    );

    // Unsolicited snapshots, later wins.
    first.peer.deliver(encode_snapshot(&after_x).unwrap());
    first.peer.deliver(encode_snapshot(&after_o).unwrap());

    let mut mirror = first.adapter.model().watch();
    timeout(WAIT, mirror.wait_for(|state| state.as_ref() == Some(&after_o)))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_connection_loss_is_fatal() {
    let initial = GameState::new();
    let first = participant(Role::FirstMover, &initial);
    let mut events = first.adapter.model().subscribe();

    first.peer.fail("server went away");

    match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
        ModelEvent::ConnectionLost(reason) => assert_eq!(reason, "server went away"),
        other => panic!("Expected ConnectionLost, got {other:?}"),
    }

    let err = first.adapter.fetch_state("g1").await.unwrap_err();
    assert_eq!(err.kind(), &SyncErrorKind::NotConnected);
    assert_eq!(first.adapter.model().snapshot(), Some(initial));
}
