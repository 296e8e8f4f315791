//! Room session management for Jackroom.
//!
//! Every configured room has one transient [`GameSession`] guarded by its
//! own lock, and one periodic timer that resets the room. The same
//! [`reset`](RoomRegistry::reset) protocol runs when the timer fires and
//! when a user wins the jackpot, and both go through the room's lock.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: loads rooms, owns sessions and timers, runs resets
//! - [`ResetTrigger`]: why a reset happened
//!
//! [`GameSession`]: jackroom_session::GameSession

mod error;
mod registry;
mod room;

pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::ResetTrigger;
