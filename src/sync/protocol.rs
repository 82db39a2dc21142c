//! Wire protocol: JSON envelopes exchanged over the duplex channel.
//!
//! Client to authoritative side, one discriminant key per message:
//!
//! ```json
//! {"read": "<session id>"}
//! {"update": {"coordinates": {...}, "last_mark": "X", "status": 2}}
//! ```
//!
//! Authoritative side to client: a full [`GameState`] snapshot.

use crate::games::tictactoe::{GameState, StatePatch};
use crate::sync::error::SyncError;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Identifier of a game session.
pub type SessionId = String;

/// Message sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMessage {
    /// Request the current canonical state.
    Read(SessionId),
    /// Propose a state mutation.
    Update(StatePatch),
}

impl ClientMessage {
    /// Encodes the message as a JSON text frame.
    #[instrument(skip(self))]
    pub fn encode(&self) -> Result<String, SyncError> {
        let text = serde_json::to_string(self)?;
        debug!(payload = %text, "Encoded client message");
        Ok(text)
    }

    /// Decodes a client message. Used by the authoritative side.
    #[instrument(skip(text))]
    pub fn decode(text: &str) -> Result<Self, SyncError> {
        serde_json::from_str(text).map_err(|e| {
            warn!(error = %e, payload = %text, "Unrecognized client message");
            SyncError::protocol(format!("Unrecognized client message: {e}"))
        })
    }
}

/// Encodes a canonical snapshot as a JSON text frame.
#[instrument(skip(state))]
pub fn encode_snapshot(state: &GameState) -> Result<String, SyncError> {
    Ok(serde_json::to_string(state)?)
}

/// Decodes an inbound frame as a full canonical snapshot.
///
/// Fails if the frame is not JSON, or is JSON without the shape of a
/// state object (`coordinates` and `status` are required).
#[instrument(skip(text))]
pub fn decode_snapshot(text: &str) -> Result<GameState, SyncError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        warn!(error = %e, "Inbound frame is not JSON");
        SyncError::protocol(format!("Inbound frame is not JSON: {e}"))
    })?;

    if !value.is_object() {
        warn!(payload = %text, "Inbound frame is not an object");
        return Err(SyncError::protocol("Inbound frame is not a state object"));
    }

    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, payload = %text, "Inbound frame is not a state object");
        SyncError::protocol(format!("Inbound frame is not a state object: {e}"))
    })
}
