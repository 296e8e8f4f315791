//! Per-room and per-connection game state.
//!
//! Both structures are transient: they exist only in memory and are
//! rebuilt from the store on startup and on every room reset.

use std::time::SystemTime;

use jackroom_protocol::RoomId;
use jackroom_store::{GameRecordSnapshot, RoomConfig};
use rand::distr::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;

/// Length of a generated game id.
pub const GAME_ID_LEN: usize = 20;

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// The resettable state of one room's current round.
///
/// Replaced wholesale on every reset; mutated only under the room's lock.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    pub room_id: RoomId,
    /// Random token identifying this round.
    pub game_id: String,
    pub total_bet_amount: i64,
    /// Connections that joined this round (recounted on reset).
    pub total_user: i32,
    /// The jackpot pool reported to clients.
    pub total_jackpot_amount: i64,
    pub is_jackpot: bool,
    pub target_payout: Decimal,
    pub max_bet_amount: i64,
    pub max_user: i32,
    pub created_at: SystemTime,
}

impl GameSession {
    /// A fresh round for `room`: zeroed counters, a new game id, and the
    /// jackpot pool at the room's base amount.
    pub fn new(room: &RoomConfig) -> Self {
        Self {
            room_id: room.room_id,
            game_id: generate_game_id(),
            total_bet_amount: 0,
            total_user: 0,
            total_jackpot_amount: room.base_jackpot_amount,
            is_jackpot: false,
            target_payout: room.target_payout,
            max_bet_amount: room.max_bet_amount,
            max_user: room.max_user,
            created_at: SystemTime::now(),
        }
    }

    /// The aggregated record persisted when this round ends.
    pub fn to_record(&self) -> GameRecordSnapshot {
        GameRecordSnapshot {
            room_id: self.room_id,
            total_bet_amount: self.total_bet_amount,
            total_user: self.total_user,
            total_jackpot_amount: self.total_jackpot_amount,
            is_jackpot: self.is_jackpot,
            updated_at: SystemTime::now(),
        }
    }
}

fn generate_game_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GAME_ID_LEN)
        .map(char::from)
        .collect()
}

// ---------------------------------------------------------------------------
// GameUser
// ---------------------------------------------------------------------------

/// Betting and payout state of one joined connection.
#[derive(Debug, Clone, PartialEq)]
pub struct GameUser {
    pub user_id: String,
    pub room_id: RoomId,
    pub bet_count: i32,
    pub current_payout: Decimal,
    /// Balance at join time, refreshed on every reset.
    pub initial_coins: i64,
    pub user_total_profit: i64,
    pub user_total_bet_amount: i64,
    /// Bets placed during the current round; the session-end reward is
    /// computed from this.
    pub user_session_bet_amount: i64,
    pub jackpot_prob: Decimal,
}

impl GameUser {
    /// A freshly joined user: every counter zero.
    pub fn new(user_id: impl Into<String>, room_id: RoomId, initial_coins: i64) -> Self {
        Self {
            user_id: user_id.into(),
            room_id,
            bet_count: 0,
            current_payout: Decimal::ZERO,
            initial_coins,
            user_total_profit: 0,
            user_total_bet_amount: 0,
            user_session_bet_amount: 0,
            jackpot_prob: Decimal::ZERO,
        }
    }

    /// Applies one field mutation.
    pub fn apply(&mut self, update: UserUpdate) {
        match update {
            UserUpdate::IncrementBetCount => {
                self.bet_count = self.bet_count.saturating_add(1);
            }
            UserUpdate::SetPayout(payout) => self.current_payout = payout,
            UserUpdate::AccumulateProfit(amount) => {
                self.user_total_profit = self.user_total_profit.saturating_add(amount);
            }
            UserUpdate::AccumulateBetAmount(amount) => {
                self.user_total_bet_amount =
                    self.user_total_bet_amount.saturating_add(amount);
            }
            UserUpdate::AccumulateSessionBetAmount(amount) => {
                self.user_session_bet_amount =
                    self.user_session_bet_amount.saturating_add(amount);
            }
            UserUpdate::SetJackpotProb(prob) => self.jackpot_prob = prob,
        }
    }

    /// Zeroes the payout, profit, and bet-amount counters. A
    /// [`ResetLevel::Hard`] reset also zeroes bet count and jackpot
    /// probability.
    pub fn reset(&mut self, level: ResetLevel) {
        self.current_payout = Decimal::ZERO;
        self.user_total_profit = 0;
        self.user_total_bet_amount = 0;
        self.user_session_bet_amount = 0;
        if level == ResetLevel::Hard {
            self.bet_count = 0;
            self.jackpot_prob = Decimal::ZERO;
        }
    }
}

/// A single typed mutation of a [`GameUser`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserUpdate {
    IncrementBetCount,
    SetPayout(Decimal),
    AccumulateProfit(i64),
    AccumulateBetAmount(i64),
    AccumulateSessionBetAmount(i64),
    SetJackpotProb(Decimal),
}

/// How much of a [`GameUser`] a reset clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetLevel {
    /// Payout, profit, and bet amounts. Applied to every room member when
    /// a round ends.
    Soft,
    /// Everything `Soft` clears plus bet count and jackpot probability.
    /// Applied to a jackpot winner.
    Hard,
}
