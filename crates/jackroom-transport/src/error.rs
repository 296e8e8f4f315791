/// Socket and framing failures.
///
/// All of these end the connection they occur on.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Writing to a connection that is already closed.
    #[error("connection {0} is closed")]
    ConnectionClosed(String),

    #[error("write to peer failed: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("read from peer failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The listener could not bind or accept.
    #[error("listener error: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Malformed or oversized length prefix, or a stream that ended
    /// mid-frame.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
