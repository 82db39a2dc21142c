//! Sync error types.

use derive_more::{Display, Error};
use tracing::instrument;

/// Kind of failure in the sync core.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SyncErrorKind {
    /// A send was attempted before the channel opened.
    #[display("Channel is not connected")]
    NotConnected,

    /// An inbound payload was malformed or not a recognized state.
    #[display("Protocol error: {}", _0)]
    Protocol(String),

    /// The connection was lost; the session cannot continue.
    #[display("Connection lost: {}", _0)]
    ConnectionLost(String),

    /// The underlying transport failed to connect or send.
    #[display("Transport error: {}", _0)]
    Transport(String),
}

/// Sync error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{} at {}:{}", kind, file, line)]
pub struct SyncError {
    /// What went wrong.
    pub kind: SyncErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SyncError {
    /// Creates a new sync error with caller location tracking.
    #[track_caller]
    #[instrument(skip(kind))]
    pub fn new(kind: SyncErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for [`SyncErrorKind::NotConnected`].
    #[track_caller]
    pub fn not_connected() -> Self {
        Self::new(SyncErrorKind::NotConnected)
    }

    /// Shorthand for [`SyncErrorKind::Protocol`].
    #[track_caller]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Protocol(message.into()))
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &SyncErrorKind {
        &self.kind
    }
}

impl From<serde_json::Error> for SyncError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::protocol(err.to_string())
    }
}
