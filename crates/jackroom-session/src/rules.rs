//! Rates that shape rewards and the jackpot pool.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tunable game economics. Every rate defaults to 10 %.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Share of a user's round bets returned when the round ends.
    pub reward_rate: Decimal,
    /// Profit relative to `initial_coins` above which a user's bet total
    /// is cleared.
    pub profit_reset_threshold: Decimal,
    /// Share of every bet added to the room's jackpot pool.
    pub jackpot_contribution_rate: Decimal,
}

impl Default for GameRules {
    fn default() -> Self {
        let ten_percent = Decimal::new(1, 1);
        Self {
            reward_rate: ten_percent,
            profit_reset_threshold: ten_percent,
            jackpot_contribution_rate: ten_percent,
        }
    }
}

impl GameRules {
    /// Coins credited at round end for `session_bet_amount`, truncated
    /// toward zero.
    pub fn session_reward(&self, session_bet_amount: i64) -> i32 {
        (Decimal::from(session_bet_amount) * self.reward_rate)
            .trunc()
            .to_i32()
            .unwrap_or(i32::MAX)
    }

    /// Coins a bet adds to the jackpot pool, rounded half to even.
    pub fn jackpot_contribution(&self, bet_amount: i64) -> i64 {
        (Decimal::from(bet_amount) * self.jackpot_contribution_rate)
            .round()
            .to_i64()
            .unwrap_or(0)
    }

    /// Whether `profit` exceeds the reset threshold of `initial_coins`.
    /// Never true for a non-positive `initial_coins`.
    pub fn profit_exceeds_threshold(&self, profit: i64, initial_coins: i64) -> bool {
        initial_coins > 0
            && Decimal::from(profit) / Decimal::from(initial_coins)
                > self.profit_reset_threshold
    }
}
