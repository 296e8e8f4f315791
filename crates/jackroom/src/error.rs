//! Unified error type for the Jackroom server.

use jackroom_protocol::ProtocolError;
use jackroom_room::RoomError;
use jackroom_session::SessionError;
use jackroom_store::StoreError;
use jackroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum JackroomError {
    /// Connection, framing, or socket failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Undecodable request or unknown discriminant.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Unjoined connection or unknown user.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl JackroomError {
    /// Whether the error ends the connection it occurred on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Protocol(_))
    }
}
