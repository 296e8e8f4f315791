//! Error types for the protocol layer.
//!
//! Every variant is fatal to the connection that produced the bytes: the
//! dispatcher stops reading and runs cleanup.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame body is not a valid protobuf record.
    #[error("decode failed: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The envelope's discriminant names no known request type.
    #[error("unknown request type: {0:?}")]
    UnknownRequest(String),

    /// The discriminant names a request whose payload is not populated.
    #[error("{0} carries no {0} payload")]
    MissingPayload(String),

    /// A decimal field is outside what a 96-bit decimal can represent.
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),
}
