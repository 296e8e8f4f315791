//! Varint length-prefixed framing on a byte stream.
//!
//! Every message on the wire is `varint(len) ++ body`, where the prefix is
//! the protobuf base-128 encoding of the body length. Only the read side
//! lives here; writers hand the connection an already-framed buffer.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::TransportError;

/// A base-128 `u64` never needs more than ten bytes.
pub const MAX_VARINT_LEN: usize = 10;

/// Default upper bound on a frame body.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Reads one frame body from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly on a frame boundary.
/// A stream that ends inside a prefix or body, a prefix longer than
/// [`MAX_VARINT_LEN`], or a body above `max_len` is an
/// [`TransportError::InvalidFrame`].
pub async fn read_frame<R>(
    reader: &mut R,
    max_len: usize,
) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let Some(len) = read_length_prefix(reader).await? else {
        return Ok(None);
    };

    if len > max_len as u64 {
        return Err(TransportError::InvalidFrame(format!(
            "frame of {len} bytes exceeds limit of {max_len}"
        )));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            TransportError::InvalidFrame(format!(
                "stream ended inside a {len}-byte frame"
            ))
        } else {
            TransportError::ReceiveFailed(e)
        }
    })?;

    Ok(Some(body))
}

async fn read_length_prefix<R>(
    reader: &mut R,
) -> Result<Option<u64>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof && i == 0 => {
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(TransportError::InvalidFrame(
                    "stream ended inside length prefix".into(),
                ));
            }
            Err(e) => return Err(TransportError::ReceiveFailed(e)),
        };

        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some(value));
        }
    }

    Err(TransportError::InvalidFrame(format!(
        "length prefix longer than {MAX_VARINT_LEN} bytes"
    )))
}
