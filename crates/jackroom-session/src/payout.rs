//! Payout and jackpot-probability formulas.
//!
//! Pure functions of their arguments. All arithmetic is exact decimal;
//! nothing is rounded.
//!
//! ```text
//! adjusted    = (targetPayout − currentPayout) / 2
//! betShare    = adjusted × (userTotalBetAmount / maxBetAmount)
//! crowdShare  = adjusted × (totalUser / maxUser)
//! payout      = (betShare + crowdShare) / 2
//! jackpotProb = betCount / 3000
//! ```

use rust_decimal::Decimal;

use crate::{GameSession, GameUser};

/// Bets needed for a jackpot probability of 1. The result is not capped.
pub const JACKPOT_PROB_BETS: i64 = 3_000;

/// Payout for `user` in `session`.
///
/// Callers validate room configuration so that `max_bet_amount` and
/// `max_user` are positive; a zero denominator contributes a zero share.
pub fn payout(session: &GameSession, user: &GameUser) -> Decimal {
    let two = Decimal::TWO;
    let adjusted = (session.target_payout - user.current_payout) / two;
    let bet_share = adjusted
        * ratio(user.user_total_bet_amount, session.max_bet_amount);
    let crowd_share = adjusted
        * ratio(i64::from(session.total_user), i64::from(session.max_user));
    (bet_share + crowd_share) / two
}

/// Jackpot probability after `bet_count` bets.
pub fn jackpot_prob(bet_count: i32) -> Decimal {
    Decimal::from(bet_count) / Decimal::from(JACKPOT_PROB_BETS)
}

fn ratio(numerator: i64, denominator: i64) -> Decimal {
    Decimal::from(numerator)
        .checked_div(Decimal::from(denominator))
        .unwrap_or(Decimal::ZERO)
}
