//! # Jackroom
//!
//! Real-time session server for a multiplayer casino game.
//!
//! Clients connect over TCP, exchange varint-length-prefixed protobuf
//! envelopes, join numbered rooms, place bets, and receive payout and
//! jackpot updates. Each room's round is reset on a fixed period and
//! whenever someone wins the jackpot.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jackroom::prelude::*;
//!
//! # async fn run() -> Result<(), JackroomError> {
//! let server = JackroomServerBuilder::new()
//!     .bind("127.0.0.1:4000")
//!     .build(MemoryStore::load("seed.json")?)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
pub mod handler;
mod server;

pub use config::{Args, ServerConfig};
pub use error::JackroomError;
pub use server::{JackroomServer, JackroomServerBuilder, TcpRooms};

/// Everything needed to run a server or write a client.
pub mod prelude {
    pub use crate::{JackroomError, JackroomServer, JackroomServerBuilder, ServerConfig};

    pub use jackroom_protocol::{
        request_type, response_type, ClientRequest, Codec, ProstCodec, RoomId, ServerResponse,
    };
    pub use jackroom_room::{ResetTrigger, RoomRegistry};
    pub use jackroom_session::{GameRules, GameSession, GameUser};
    pub use jackroom_store::{GameStore, MemoryStore, RoomConfig, StoreSeed, UserRecord};
}
