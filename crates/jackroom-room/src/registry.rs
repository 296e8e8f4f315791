//! The room session registry: one [`Room`] per configured room id.
//!
//! Every mutation of a room's [`GameSession`] happens inside
//! [`Room::with_session`]. Compound updates that also touch per-user
//! state (bets, joins, resets) call into the [`ClientRegistry`] from
//! inside that closure, so the lock order is always room → client.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use jackroom_protocol::{Codec, RoomId, ServerResponse};
use jackroom_session::{
    payout, ClientRegistry, GameRules, GameSession, GameUser, MessageSender, ResetLevel,
    UserUpdate,
};
use jackroom_store::GameStore;
use jackroom_timer::TimerConfig;
use jackroom_transport::{Connection, ConnectionId};
use tracing::{debug, info, warn};

use crate::room::{ResetTrigger, Room};
use crate::RoomError;

/// Owns every room's session, lock, and reset timer.
///
/// Always handled through an `Arc`: room timers hold a weak reference back
/// to the registry and stop resetting once it is dropped.
pub struct RoomRegistry<C: Connection, K: Codec, S: GameStore> {
    rooms: DashMap<RoomId, Arc<Room>>,
    clients: Arc<ClientRegistry<C>>,
    sender: Arc<MessageSender<C, K>>,
    store: Arc<S>,
    rules: GameRules,
    timer: TimerConfig,
    this: Weak<Self>,
}

impl<C: Connection, K: Codec, S: GameStore> RoomRegistry<C, K, S> {
    /// Creates an empty registry. Call
    /// [`initialize_rooms`](Self::initialize_rooms) to load rooms.
    pub fn new(
        clients: Arc<ClientRegistry<C>>,
        sender: Arc<MessageSender<C, K>>,
        store: Arc<S>,
        rules: GameRules,
        timer: TimerConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            rooms: DashMap::new(),
            clients,
            sender,
            store,
            rules,
            timer,
            this: Weak::clone(this),
        })
    }

    pub fn clients(&self) -> &Arc<ClientRegistry<C>> {
        &self.clients
    }

    pub fn sender(&self) -> &Arc<MessageSender<C, K>> {
        &self.sender
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Loads every room from the store, builds a fresh session for each,
    /// and starts its reset timer.
    ///
    /// Rooms with a non-positive `max_bet_amount` or `max_user` are
    /// skipped. Returns how many rooms were loaded.
    pub async fn initialize_rooms(&self) -> Result<usize, RoomError> {
        let configs = self.store.get_all_rooms().await?;
        let mut loaded = 0;

        for config in configs {
            let room_id = config.room_id;
            if !config.is_valid() {
                warn!(
                    %room_id,
                    max_bet_amount = config.max_bet_amount,
                    max_user = config.max_user,
                    "skipping room with invalid configuration"
                );
                continue;
            }

            match self.store.get_record(room_id).await {
                Ok(Some(record)) => info!(
                    %room_id,
                    total_bet_amount = record.total_bet_amount,
                    total_user = record.total_user,
                    is_jackpot = record.is_jackpot,
                    "previous game record"
                ),
                Ok(None) => debug!(%room_id, "no previous game record"),
                Err(e) => warn!(%room_id, error = %e, "failed to read game record"),
            }

            let room = Arc::new(Room::new(config, self.timer.clone()));
            if let Some(old) = self.rooms.insert(room_id, room) {
                old.timer.stop();
            }
            self.start_timer(room_id)?;
            loaded += 1;
        }

        info!(rooms = loaded, period_secs = self.timer.period.as_secs(), "rooms initialized");
        Ok(loaded)
    }

    /// Configured room ids in ascending order.
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.iter().map(|r| *r.key()).collect();
        ids.sort_by_key(|id| id.0);
        ids
    }

    pub fn contains(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    /// A copy of the room's current session.
    pub fn get_session(&self, room_id: RoomId) -> Result<GameSession, RoomError> {
        Ok(self.room(room_id)?.snapshot())
    }

    /// Runs `f` under the room's lock.
    pub fn with_session<R>(
        &self,
        room_id: RoomId,
        f: impl FnOnce(&mut GameSession) -> R,
    ) -> Result<R, RoomError> {
        Ok(self.room(room_id)?.with_session(f))
    }

    /// Returns the new user count.
    pub fn increment_total_user(&self, room_id: RoomId) -> Result<i32, RoomError> {
        self.with_session(room_id, |s| {
            s.total_user = s.total_user.saturating_add(1);
            s.total_user
        })
    }

    pub fn set_jackpot_flag(&self, room_id: RoomId, is_jackpot: bool) -> Result<(), RoomError> {
        self.with_session(room_id, |s| s.is_jackpot = is_jackpot)
    }

    // -----------------------------------------------------------------------
    // Compound updates (room lock held throughout)
    // -----------------------------------------------------------------------

    /// Counts a newly joined connection and recomputes every member's
    /// payout against the larger crowd.
    pub fn admit(&self, room_id: RoomId) -> Result<GameSession, RoomError> {
        self.with_session(room_id, |session| {
            session.total_user = session.total_user.saturating_add(1);
            self.clients.recompute_room_payouts(session);
            session.clone()
        })
    }

    /// Records an accepted bet: bumps the user's counters and the room's
    /// totals, grows the jackpot pool, and recomputes payout and jackpot
    /// probability.
    pub fn record_bet(
        &self,
        id: ConnectionId,
        room_id: RoomId,
        bet_amount: i64,
    ) -> Result<(GameSession, GameUser), RoomError> {
        let contribution = self.rules.jackpot_contribution(bet_amount);
        let room = self.room(room_id)?;
        let recorded = room.with_session(|session| {
            self.clients.apply(id, UserUpdate::IncrementBetCount)?;
            self.clients.apply(id, UserUpdate::AccumulateBetAmount(bet_amount))?;
            self.clients
                .apply(id, UserUpdate::AccumulateSessionBetAmount(bet_amount))?;
            session.total_bet_amount = session.total_bet_amount.saturating_add(bet_amount);
            session.total_jackpot_amount =
                session.total_jackpot_amount.saturating_add(contribution);
            let user = self.clients.recompute_payout(id, session)?;
            let prob = payout::jackpot_prob(user.bet_count);
            let user = self.clients.apply(id, UserUpdate::SetJackpotProb(prob))?;
            Ok::<_, RoomError>((session.clone(), user))
        })?;
        Ok(recorded)
    }

    /// Runs the profit-triggered soft reset check for one user.
    pub fn check_profit_reset(
        &self,
        id: ConnectionId,
        room_id: RoomId,
    ) -> Result<Option<GameUser>, RoomError> {
        let room = self.room(room_id)?;
        let reset =
            room.with_session(|session| self.clients.check_profit_reset(id, session, &self.rules))?;
        Ok(reset)
    }

    /// Clears one user's state at `level` against the current session.
    pub fn reset_user(
        &self,
        id: ConnectionId,
        room_id: RoomId,
        level: ResetLevel,
        balance: Option<i64>,
    ) -> Result<GameUser, RoomError> {
        let room = self.room(room_id)?;
        let user = room.with_session(|session| self.clients.reset_user(id, session, level, balance))?;
        Ok(user)
    }

    // -----------------------------------------------------------------------
    // Reset protocol
    // -----------------------------------------------------------------------

    /// Ends the room's current round and starts a new one.
    ///
    /// 1. Under the room lock, snapshot the session and replace it with a
    ///    fresh one for the room's current members.
    /// 2. Credit each member their session reward and send them a
    ///    session-end message; soft-reset them against the new session.
    /// 3. Broadcast per-user state.
    /// 4. Persist the snapshot. A failed save is logged.
    /// 5. Restart the room's timer.
    ///
    /// Resets of the same room run one at a time.
    pub async fn reset(
        &self,
        room_id: RoomId,
        trigger: ResetTrigger,
    ) -> Result<GameSession, RoomError> {
        let room = self.room(room_id)?;
        let _serial = room.reset_guard.lock().await;
        self.reset_locked(&room, room_id, trigger).await
    }

    /// The timer's reset. Skipped if another reset of the room completed
    /// while this one waited for the reset guard; that reset already
    /// restarted the period.
    async fn periodic_reset(&self, room_id: RoomId) -> Result<Option<GameSession>, RoomError> {
        let room = self.room(room_id)?;
        let seen = room.generation();
        let _serial = room.reset_guard.lock().await;
        if room.generation() != seen {
            debug!(%room_id, "room was reset while the timer waited, skipping");
            return Ok(None);
        }
        self.reset_locked(&room, room_id, ResetTrigger::Timer).await.map(Some)
    }

    async fn reset_locked(
        &self,
        room: &Room,
        room_id: RoomId,
        trigger: ResetTrigger,
    ) -> Result<GameSession, RoomError> {
        let config = match self.store.get_room(room_id).await? {
            Some(config) => config,
            None => {
                warn!(%room_id, "room missing from store, reusing startup configuration");
                room.config.clone()
            }
        };

        let (snapshot, session, members) = room.with_session(|current| {
            let members = self.clients.clients_in_room(room_id);
            let mut next = GameSession::new(&config);
            next.total_user = i32::try_from(members.len()).unwrap_or(i32::MAX);
            next.is_jackpot = trigger == ResetTrigger::Jackpot;
            if trigger == ResetTrigger::Timer {
                next.total_jackpot_amount = current.total_jackpot_amount;
            }
            let snapshot = room.replace_session(current, next.clone());
            (snapshot, next, members)
        });

        for &id in &members {
            let balance = self.reward(id).await;
            if let Err(e) = self.reset_user(id, room_id, ResetLevel::Soft, balance) {
                debug!(conn_id = %id, %room_id, error = %e, "member left during reset");
            }
        }

        self.sender.broadcast_user_state(room_id).await;

        if let Err(e) = self.store.save_record(snapshot.to_record()).await {
            warn!(%room_id, error = %e, "failed to save game record");
        }

        self.restart_timer(room, room_id);

        info!(
            %room_id,
            %trigger,
            previous_game = %snapshot.game_id,
            game_id = %session.game_id,
            total_bet_amount = snapshot.total_bet_amount,
            members = members.len(),
            "room reset"
        );
        Ok(session)
    }

    /// Credits one member's session reward and tells them about it.
    /// Returns their balance afterwards, if known.
    async fn reward(&self, id: ConnectionId) -> Option<i64> {
        let user = self.clients.get(id).ok()?;
        let reward = self.rules.session_reward(user.user_session_bet_amount);

        let update = match self
            .store
            .adjust_and_save(&user.user_id, i64::from(reward))
            .await
        {
            Ok(Some(update)) => update,
            Ok(None) => {
                debug!(conn_id = %id, user_id = %user.user_id, "reward skipped, user not found");
                return None;
            }
            Err(e) => {
                warn!(conn_id = %id, user_id = %user.user_id, error = %e, "reward failed");
                return None;
            }
        };

        let coins = update.user.coins;
        let response = ServerResponse::game_session_end(coins, reward);
        if let Err(e) = self.sender.send_to(id, &response).await {
            debug!(conn_id = %id, error = %e, "session end not delivered");
        }
        Some(coins)
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Starts the room's reset timer. Returns `false` if already running.
    pub fn start_timer(&self, room_id: RoomId) -> Result<bool, RoomError> {
        let room = self.room(room_id)?;
        Ok(self.spawn_timer(&room, room_id))
    }

    /// Stops the room's reset timer. Returns `false` if it was not running.
    pub fn stop_timer(&self, room_id: RoomId) -> Result<bool, RoomError> {
        Ok(self.room(room_id)?.timer.stop())
    }

    pub fn is_timer_running(&self, room_id: RoomId) -> Result<bool, RoomError> {
        Ok(self.room(room_id)?.timer.is_running())
    }

    fn restart_timer(&self, room: &Room, room_id: RoomId) {
        if room.timer.is_running() {
            room.timer.restart();
        } else {
            self.spawn_timer(room, room_id);
        }
    }

    fn spawn_timer(&self, room: &Room, room_id: RoomId) -> bool {
        let this = Weak::clone(&self.this);
        room.timer.start(move || {
            let this = Weak::clone(&this);
            async move {
                let Some(rooms) = this.upgrade() else {
                    return;
                };
                if let Err(e) = rooms.periodic_reset(room_id).await {
                    warn!(%room_id, error = %e, "periodic reset failed");
                }
            }
        })
    }

    fn room(&self, room_id: RoomId) -> Result<Arc<Room>, RoomError> {
        self.rooms
            .get(&room_id)
            .map(|r| Arc::clone(r.value()))
            .ok_or(RoomError::NotFound(room_id))
    }
}

impl<C: Connection, K: Codec, S: GameStore> Drop for RoomRegistry<C, K, S> {
    fn drop(&mut self) {
        for room in self.rooms.iter() {
            room.timer.stop();
        }
    }
}
