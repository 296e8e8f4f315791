//! In-process store backed by concurrent maps.

use std::path::Path;

use dashmap::DashMap;
use jackroom_protocol::RoomId;
use serde::{Deserialize, Serialize};

use crate::{
    BalanceStore, BalanceUpdate, GameRecordSnapshot, GameRecordStore,
    RoomConfig, RoomConfigStore, StoreError, UserRecord,
};

/// Initial contents for a [`MemoryStore`].
///
/// ```json
/// {
///   "rooms": [
///     { "roomId": 1, "targetPayout": "0.95", "maxBetAmount": 100000,
///       "maxUser": 10, "baseJackpotAmount": 50000 }
///   ],
///   "users": [ { "userId": "alice", "coins": 500000 } ],
///   "records": []
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSeed {
    #[serde(default)]
    pub rooms: Vec<RoomConfig>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub records: Vec<GameRecordSnapshot>,
}

/// A [`GameStore`](crate::GameStore) that keeps everything in memory.
///
/// Balance adjustments hold the user's map shard while they check and
/// apply the delta, so concurrent bets on one user never lose an update.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, i64>,
    rooms: DashMap<RoomId, RoomConfig>,
    records: DashMap<RoomId, GameRecordSnapshot>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the seed's rooms, users, and records.
    pub fn from_seed(seed: StoreSeed) -> Self {
        let store = Self::new();
        for room in seed.rooms {
            store.rooms.insert(room.room_id, room);
        }
        for user in seed.users {
            store.users.insert(user.user_id, user.coins);
        }
        for record in seed.records {
            store.records.insert(record.room_id, record);
        }
        store
    }

    /// Loads a JSON [`StoreSeed`] from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let seed: StoreSeed = serde_json::from_slice(&bytes)?;
        tracing::info!(
            path = %path.display(),
            rooms = seed.rooms.len(),
            users = seed.users.len(),
            "loaded store seed"
        );
        Ok(Self::from_seed(seed))
    }

    /// Inserts or replaces a user's balance.
    pub fn insert_user(&self, user_id: impl Into<String>, coins: i64) {
        self.users.insert(user_id.into(), coins);
    }

    /// Deletes a user. Returns the balance they had.
    pub fn remove_user(&self, user_id: &str) -> Option<i64> {
        self.users.remove(user_id).map(|(_, coins)| coins)
    }

    /// Inserts or replaces a room's configuration.
    pub fn insert_room(&self, room: RoomConfig) {
        self.rooms.insert(room.room_id, room);
    }

    /// Current balance, if the user exists.
    pub fn coins(&self, user_id: &str) -> Option<i64> {
        self.users.get(user_id).map(|c| *c)
    }

    fn adjust(&self, user_id: &str, delta: i64) -> Result<Option<BalanceUpdate>, StoreError> {
        let Some(mut coins) = self.users.get_mut(user_id) else {
            return Ok(None);
        };

        let next = coins
            .checked_add(delta)
            .ok_or_else(|| StoreError::BalanceOverflow(user_id.to_string()))?;

        let applied = next >= 0;
        if applied {
            *coins = next;
        }

        Ok(Some(BalanceUpdate {
            user: UserRecord {
                user_id: user_id.to_string(),
                coins: *coins,
            },
            applied,
        }))
    }
}

impl BalanceStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.coins(user_id).map(|coins| UserRecord {
            user_id: user_id.to_string(),
            coins,
        }))
    }

    async fn adjust_and_save(
        &self,
        user_id: &str,
        delta: i64,
    ) -> Result<Option<BalanceUpdate>, StoreError> {
        self.adjust(user_id, delta)
    }
}

impl RoomConfigStore for MemoryStore {
    async fn get_all_rooms(&self) -> Result<Vec<RoomConfig>, StoreError> {
        let mut rooms: Vec<RoomConfig> =
            self.rooms.iter().map(|r| r.value().clone()).collect();
        rooms.sort_by_key(|r| r.room_id);
        Ok(rooms)
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Option<RoomConfig>, StoreError> {
        Ok(self.rooms.get(&room_id).map(|r| r.value().clone()))
    }
}

impl GameRecordStore for MemoryStore {
    async fn get_record(
        &self,
        room_id: RoomId,
    ) -> Result<Option<GameRecordSnapshot>, StoreError> {
        Ok(self.records.get(&room_id).map(|r| r.value().clone()))
    }

    async fn save_record(&self, record: GameRecordSnapshot) -> Result<(), StoreError> {
        self.records.insert(record.room_id, record);
        Ok(())
    }
}
