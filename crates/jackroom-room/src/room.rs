//! One configured room: its current session, its lock, and its timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use jackroom_session::GameSession;
use jackroom_store::RoomConfig;
use jackroom_timer::{PeriodicTimer, TimerConfig};

/// Why a room's session is being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTrigger {
    /// The room's periodic timer fired. The jackpot pool carries over.
    Timer,
    /// A user won the jackpot. The pool restarts from the room's base
    /// amount and the new session is flagged as a jackpot session.
    Jackpot,
}

impl std::fmt::Display for ResetTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timer => f.write_str("timer"),
            Self::Jackpot => f.write_str("jackpot"),
        }
    }
}

pub(crate) struct Room {
    /// Configuration read at startup; used if the store loses the room.
    pub(crate) config: RoomConfig,
    session: Mutex<GameSession>,
    /// Held for the whole reset protocol so two resets of one room never
    /// interleave their reward and soft-reset passes.
    pub(crate) reset_guard: tokio::sync::Mutex<()>,
    pub(crate) timer: PeriodicTimer,
    /// Completed resets. Bumped while the session lock is held.
    generation: AtomicU64,
}

impl Room {
    pub(crate) fn new(config: RoomConfig, timer: TimerConfig) -> Self {
        let session = GameSession::new(&config);
        Self {
            config,
            session: Mutex::new(session),
            reset_guard: tokio::sync::Mutex::new(()),
            timer: PeriodicTimer::new(timer),
            generation: AtomicU64::new(0),
        }
    }

    /// Runs `f` with the room lock held.
    ///
    /// The guard never escapes this call, so it is never held across an
    /// `.await`.
    pub(crate) fn with_session<R>(&self, f: impl FnOnce(&mut GameSession) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }

    pub(crate) fn snapshot(&self) -> GameSession {
        self.with_session(|s| s.clone())
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Swaps in `next` and returns the session it replaced.
    pub(crate) fn replace_session(&self, current: &mut GameSession, next: GameSession) -> GameSession {
        self.generation.fetch_add(1, Ordering::AcqRel);
        std::mem::replace(current, next)
    }
}
