//! State synchronization core.
//!
//! Leaves first: [`transport`] carries JSON text frames over one duplex
//! channel, [`adapter`] maps fetch/submit onto it, [`model`] mirrors the
//! canonical state and publishes field changes, and [`controller`]
//! validates moves before anything is sent.

pub mod adapter;
pub mod controller;
pub mod error;
pub mod memory;
pub mod model;
pub mod protocol;
pub mod transport;
pub mod ws;

pub use adapter::SyncAdapter;
pub use controller::{MoveController, MoveError};
pub use error::{SyncError, SyncErrorKind};
pub use memory::{MemoryPeer, MemoryTransport};
pub use model::{FieldChange, GameModel, ModelEvent};
pub use protocol::{ClientMessage, SessionId, decode_snapshot, encode_snapshot};
pub use transport::{ChannelState, Inbound, Transport, TransportEvent};
pub use ws::WsTransport;
