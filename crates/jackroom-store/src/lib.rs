//! Persistence hooks for the Jackroom game-room runtime.
//!
//! The runtime never owns durable state. User balances, room
//! configuration, and per-room game records live in an external store that
//! the server reaches through three narrow traits:
//!
//! - [`BalanceStore`]: read a balance, apply a signed coin delta
//! - [`RoomConfigStore`]: static room configuration
//! - [`GameRecordStore`]: the aggregated result of each finished session
//!
//! [`MemoryStore`] implements all three for tests and single-process
//! deployments, optionally seeded from a JSON file.
//!
//! Every method returns a `Send` future: stores are called from
//! per-connection tasks and from room timer tasks alike.

mod error;
mod memory;
mod records;

pub use error::StoreError;
pub use memory::{MemoryStore, StoreSeed};
pub use records::{BalanceUpdate, GameRecordSnapshot, RoomConfig, UserRecord};

use std::future::Future;

use jackroom_protocol::RoomId;

/// Reads and adjusts user balances.
pub trait BalanceStore: Send + Sync + 'static {
    /// Returns the user's current record, or `None` if the user is unknown.
    fn get_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send;

    /// Applies a signed coin delta and persists it.
    ///
    /// A delta that would drive the balance below zero is skipped: the
    /// record is returned unchanged with `applied: false`.
    ///
    /// # Returns
    /// - `Ok(None)`: the user does not exist
    /// - `Ok(Some(update))`: the record after the call
    fn adjust_and_save(
        &self,
        user_id: &str,
        delta: i64,
    ) -> impl Future<Output = Result<Option<BalanceUpdate>, StoreError>> + Send;
}

/// Reads static room configuration.
pub trait RoomConfigStore: Send + Sync + 'static {
    /// All configured rooms, ordered by room id.
    fn get_all_rooms(
        &self,
    ) -> impl Future<Output = Result<Vec<RoomConfig>, StoreError>> + Send;

    fn get_room(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Option<RoomConfig>, StoreError>> + Send;
}

/// Reads and writes the aggregated per-room game record.
pub trait GameRecordStore: Send + Sync + 'static {
    fn get_record(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Option<GameRecordSnapshot>, StoreError>> + Send;

    /// Replaces the room's record with `record`.
    fn save_record(
        &self,
        record: GameRecordSnapshot,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Everything the game-room runtime needs from persistence.
///
/// Blanket-implemented for any type that implements the three store
/// traits, so a single backend value can be shared by every layer.
pub trait GameStore: BalanceStore + RoomConfigStore + GameRecordStore {}

impl<T> GameStore for T where T: BalanceStore + RoomConfigStore + GameRecordStore {}
