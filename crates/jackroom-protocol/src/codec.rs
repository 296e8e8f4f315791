//! Codec trait and the protobuf implementation.
//!
//! A codec turns messages into framed bytes and frame bodies back into
//! messages. The transport splits the incoming stream on the varint length
//! prefix, so [`Codec::decode`] sees one body at a time. On the way out,
//! [`Codec::encode`] writes the prefix itself so that each message costs
//! exactly one buffer.

use crate::{ClientRequest, ProtocolError, Request};

/// Encodes outgoing messages and decodes incoming frame bodies.
///
/// - `Send + Sync` → one codec instance is shared by every connection task.
/// - `'static` → it lives as long as the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes `value` into a single length-prefixed buffer.
    ///
    /// Encoding has no side effects and cannot fail for in-memory messages.
    fn encode<M: prost::Message>(&self, value: &M) -> Vec<u8>;

    /// Parses one frame body (prefix already stripped).
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// truncated.
    fn decode<M: prost::Message + Default>(
        &self,
        body: &[u8],
    ) -> Result<M, ProtocolError>;

    /// Decodes a request envelope and routes it by discriminant.
    fn decode_request(&self, body: &[u8]) -> Result<Request, ProtocolError> {
        self.decode::<ClientRequest>(body)?.into_request()
    }
}

// ---------------------------------------------------------------------------
// ProstCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `prost`.
///
/// ```rust
/// use jackroom_protocol::{ClientRequest, Codec, ProstCodec, Request};
///
/// let codec = ProstCodec;
/// let frame = codec.encode(&ClientRequest::bet("alice", 1000));
///
/// // First byte is the varint length of the rest.
/// assert_eq!(frame[0] as usize, frame.len() - 1);
///
/// let request = codec.decode_request(&frame[1..]).unwrap();
/// assert!(matches!(request, Request::Bet(b) if b.bet_amount == 1000));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ProstCodec;

impl Codec for ProstCodec {
    fn encode<M: prost::Message>(&self, value: &M) -> Vec<u8> {
        value.encode_length_delimited_to_vec()
    }

    fn decode<M: prost::Message + Default>(
        &self,
        body: &[u8],
    ) -> Result<M, ProtocolError> {
        M::decode(body).map_err(ProtocolError::Decode)
    }
}
