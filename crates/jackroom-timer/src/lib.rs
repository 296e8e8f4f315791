//! Restartable periodic timer for Jackroom.
//!
//! Each room owns one [`PeriodicTimer`]. Once started, the timer runs a
//! callback every `period` on its own task until it is stopped or dropped.
//!
//! # Restart semantics
//!
//! [`PeriodicTimer::restart`] moves the next deadline to one full period
//! from *now*. A room calls it after every reset, so the next automatic
//! reset is always one period after the last one, whether that reset came
//! from the timer or from a jackpot.
//!
//! # Integration
//!
//! ```ignore
//! let timer = PeriodicTimer::new(TimerConfig::with_period(Duration::from_secs(60)));
//! timer.start(move || {
//!     let rooms = Weak::clone(&rooms);
//!     async move {
//!         if let Some(rooms) = rooms.upgrade() {
//!             rooms.reset(room_id, ResetTrigger::Timer).await;
//!         }
//!     }
//! });
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`PeriodicTimer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Time between firings. Default: 60 s.
    pub period: Duration,
    /// Random delay (0..max) added to the *first* deadline only, so rooms
    /// started together do not all reset in the same instant.
    pub initial_jitter: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
            initial_jitter: Duration::ZERO,
        }
    }
}

impl TimerConfig {
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Replaces a zero period with [`Self::DEFAULT_PERIOD`].
    ///
    /// Called automatically by [`PeriodicTimer::new`].
    pub fn validated(mut self) -> Self {
        if self.period.is_zero() {
            warn!(
                default_secs = Self::DEFAULT_PERIOD.as_secs(),
                "timer period is zero, using default"
            );
            self.period = Self::DEFAULT_PERIOD;
        }
        self
    }

    fn first_deadline(&self) -> Instant {
        let jitter = if self.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max = u64::try_from(self.initial_jitter.as_millis()).unwrap_or(u64::MAX);
            Duration::from_millis(rand::rng().random_range(0..=max))
        };
        Instant::now() + self.period + jitter
    }
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// A periodic callback that can be stopped, started, and restarted.
///
/// All methods take `&self`, so the timer can sit inside a shared registry
/// and be restarted from the very callback it is running.
pub struct PeriodicTimer {
    config: TimerConfig,
    restart: Arc<Notify>,
    fired: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTimer {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config: config.validated(),
            restart: Arc::new(Notify::new()),
            fired: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    /// Spawns the timer task running `on_fire` every period.
    ///
    /// Returns `false` without spawning if the timer is already running.
    /// Must be called from within a Tokio runtime.
    pub fn start<F, Fut>(&self, mut on_fire: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut task = self.task();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return false;
        }

        let period = self.config.period;
        let restart = Arc::clone(&self.restart);
        let fired = Arc::clone(&self.fired);
        let mut deadline = self.config.first_deadline();

        *task = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = time::sleep_until(deadline) => {
                        let n = fired.fetch_add(1, Ordering::Relaxed) + 1;
                        trace!(fired = n, "timer fired");
                        on_fire().await;
                        deadline = Instant::now() + period;
                    }
                    _ = restart.notified() => {
                        deadline = Instant::now() + period;
                        trace!("timer restarted");
                    }
                }
            }
        }));

        debug!(period_ms = period.as_millis() as u64, "timer started");
        true
    }

    /// Aborts the timer task. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        match self.task().take() {
            Some(t) if !t.is_finished() => {
                t.abort();
                debug!("timer stopped");
                true
            }
            _ => false,
        }
    }

    /// Pushes the next firing to one full period from now.
    ///
    /// No-op on a stopped timer. A restart requested while the callback is
    /// running takes effect once the callback returns.
    pub fn restart(&self) {
        if self.is_running() {
            self.restart.notify_one();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// How many times the callback has been invoked.
    pub fn fire_count(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        if let Some(t) = self.task().take() {
            t.abort();
        }
    }
}
