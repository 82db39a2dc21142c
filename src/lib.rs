//! Strictly Sync - authoritative state sync for two-player tic-tac-toe
//!
//! Participants mirror a single canonical game state held by an
//! authoritative peer. Moves are validated locally, submitted as patches
//! over a persistent WebSocket, and only take effect once the canonical
//! snapshot comes back.
//!
//! # Architecture
//!
//! - **Games**: Tic-tac-toe state, move contracts, invariants and rules
//! - **Sync**: Transport channel, sync adapter, mirrored model, move controller
//! - **Session**: Authoritative sessions that merge and validate updates
//! - **Server**: Reference WebSocket server over the session manager
//! - **Client**: Terminal client driving a move controller from stdin
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use strictly_sync::{
//!     CellId, GameModel, MoveController, Role, SyncAdapter, Transport, WsTransport,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let (transport, inbound) = WsTransport::connect("ws://127.0.0.1:3000/game/g1/socket");
//! let adapter = Arc::new(SyncAdapter::new(transport, inbound, GameModel::new()));
//! adapter.transport().wait_open().await?;
//! adapter.fetch_state("g1").await?;
//!
//! let controller = MoveController::new("g1".to_string(), Role::FirstMover, adapter);
//! controller.propose(CellId::from("b1")).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod config;
mod games;
mod notice;
mod server;
mod session;
mod sync;

// Crate-level exports - Game types (tic-tac-toe)
pub use games::tictactoe::{
    Board, CellId, Contract, Field, GameState, GameStatus, InvalidMove, InvariantSet,
    InvariantViolation, LegalMove, Mark, Move, MoveContract, Outcome, Role, StatePatch,
    TransitionInvariants,
};

// Crate-level exports - Sync layer
pub use sync::{
    ChannelState, ClientMessage, FieldChange, GameModel, Inbound, MemoryPeer, MemoryTransport,
    ModelEvent, MoveController, MoveError, SessionId, SyncAdapter, SyncError, SyncErrorKind,
    Transport, TransportEvent, WsTransport, decode_snapshot, encode_snapshot,
};

// Crate-level exports - Session management
pub use session::{GameSession, SessionError, SessionManager};

// Crate-level exports - Server
pub use server::{router, run as run_server, serve, spawn_local};

// Crate-level exports - Configuration
pub use config::{AppConfig, ClientConfig, ConfigError, ServerConfig};

// Crate-level exports - Client
pub use client::play;
pub use notice::Notice;
