//! Error types for the room layer.

use jackroom_protocol::RoomId;
use jackroom_session::SessionError;
use jackroom_store::StoreError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room is not configured, or its configuration was rejected at
    /// startup.
    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
