//! Per-connection game state for Jackroom.
//!
//! This crate tracks who is playing where and what the game owes them:
//!
//! 1. **Game state**: [`GameSession`] for a room's current round,
//!    [`GameUser`] for one joined connection
//! 2. **Payout math**: the pure formulas in [`payout`]
//! 3. **Client tracking**: [`ClientRegistry`], one entry per joined
//!    connection and at most one connection per user
//! 4. **Fan-out**: [`MessageSender`] encodes once and writes to a
//!    connection or a whole room
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)     ← owns sessions, resets rounds, drives timers
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Store / Protocol / Transport (below)
//! ```

mod error;
mod game;
pub mod payout;
mod registry;
mod rules;
mod sender;

pub use error::SessionError;
pub use game::{GameSession, GameUser, ResetLevel, UserUpdate, GAME_ID_LEN};
pub use registry::ClientRegistry;
pub use rules::GameRules;
pub use sender::MessageSender;
