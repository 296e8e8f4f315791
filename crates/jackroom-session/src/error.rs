//! Error types for the session layer.

use jackroom_store::StoreError;
use jackroom_transport::ConnectionId;

/// Errors that can occur while tracking joined connections.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection has no game state: it never joined a room, or it
    /// was already removed.
    #[error("{0} has not joined a room")]
    NotFound(ConnectionId),

    /// The balance store has no record of this user.
    #[error("user {0} not found")]
    UserNotFound(String),

    /// A store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Writing to the connection failed.
    #[error("send to {id} failed: {reason}")]
    SendFailed { id: ConnectionId, reason: String },
}
