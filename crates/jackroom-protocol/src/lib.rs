//! Wire protocol for Jackroom.
//!
//! This crate defines the "language" that game clients and the room server
//! speak:
//!
//! - **Messages** ([`ClientRequest`], [`ServerResponse`] and their
//!   payloads): protobuf records, one per frame.
//! - **Codec** ([`Codec`] trait, [`ProstCodec`]): how those messages are
//!   converted to and from bytes.
//! - **Decimals** ([`WireDecimal`]): the 96-bit decimal layout clients
//!   use for payouts and probabilities.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (Request) → Session / Room (game state)
//! ```
//!
//! The protocol layer knows nothing about connections or rooms.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod decimal;
mod error;
mod messages;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, ProstCodec};
pub use decimal::WireDecimal;
pub use error::ProtocolError;
pub use messages::{
    request_type, response_type, AddCoinsRequest, AddCoinsResponse, BetRequest,
    BetResponse, ClientRequest, GameSessionEnd, GameState, GameUserState,
    JackpotWinRequest, JackpotWinResponse, JoinRoomRequest, Request,
    ServerResponse,
};
pub use types::RoomId;
