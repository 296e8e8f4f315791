//! Persistent records as the runtime sees them.

use std::time::SystemTime;

use jackroom_protocol::RoomId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's balance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub coins: i64,
}

/// Result of [`BalanceStore::adjust_and_save`](crate::BalanceStore::adjust_and_save).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceUpdate {
    /// The record after the call. Unchanged when `applied` is false.
    pub user: UserRecord,
    /// `false` when the delta would have driven the balance negative and
    /// was skipped.
    pub applied: bool,
}

/// Static configuration of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfig {
    pub room_id: RoomId,
    pub target_payout: Decimal,
    pub max_bet_amount: i64,
    pub max_user: i32,
    #[serde(default)]
    pub base_jackpot_amount: i64,
}

impl RoomConfig {
    /// Whether the payout ratios are well defined for this room.
    pub fn is_valid(&self) -> bool {
        self.max_bet_amount > 0 && self.max_user > 0
    }
}

/// The aggregated result of a room's last finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecordSnapshot {
    pub room_id: RoomId,
    pub total_bet_amount: i64,
    pub total_user: i32,
    #[serde(default)]
    pub total_jackpot_amount: i64,
    pub is_jackpot: bool,
    #[serde(default = "SystemTime::now")]
    pub updated_at: SystemTime,
}
