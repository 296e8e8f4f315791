//! The client registry: live connections and their game state.
//!
//! Every accepted connection that successfully joins a room gets one entry,
//! keyed by its [`ConnectionId`]. The entry owns a shared handle to the
//! connection (so other tasks can write to it) and the connection's
//! [`GameUser`].
//!
//! # Concurrency
//!
//! Entries live in a [`DashMap`], so single-entry reads and writes are safe
//! from any task. Compound updates that feed the payout formula are
//! serialized by the owning room's lock, which callers take *before*
//! touching the registry. The registry never calls back into the room
//! layer, so the lock order is always room → registry.
//!
//! A second map indexes connections by user id and enforces one live entry
//! per user.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jackroom_protocol::RoomId;
use jackroom_store::BalanceStore;
use jackroom_transport::{Connection, ConnectionId};

use crate::{payout, GameRules, GameSession, GameUser, ResetLevel, SessionError, UserUpdate};

struct ClientEntry<C> {
    conn: Arc<C>,
    user: GameUser,
}

/// Maps live connections to their game state.
pub struct ClientRegistry<C: Connection> {
    clients: DashMap<ConnectionId, ClientEntry<C>>,
    /// user id → the connection currently holding it.
    owners: DashMap<String, ConnectionId>,
}

impl<C: Connection> ClientRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            owners: DashMap::new(),
        }
    }

    /// Registers `conn` as `user_id` in `room_id`.
    ///
    /// Reads the user's balance first; an unknown user leaves the
    /// connection unjoined. If another connection already holds `user_id`,
    /// it is removed and closed before this call returns.
    ///
    /// # Errors
    /// - [`SessionError::UserNotFound`] if the store has no such user
    /// - [`SessionError::Store`] if the store call fails
    pub async fn join<S: BalanceStore>(
        &self,
        conn: Arc<C>,
        user_id: &str,
        room_id: RoomId,
        store: &S,
    ) -> Result<GameUser, SessionError> {
        let record = store
            .get_user(user_id)
            .await?
            .ok_or_else(|| SessionError::UserNotFound(user_id.to_string()))?;

        let conn_id = conn.id();
        let user = GameUser::new(user_id, room_id, record.coins);

        // The owner entry stays locked while the client map is updated so
        // two concurrent joins for one user cannot both install an entry.
        let (superseded, replaced) = match self.owners.entry(user_id.to_string()) {
            Entry::Occupied(mut owner) => {
                let previous = owner.insert(conn_id);
                let superseded = if previous != conn_id {
                    self.clients.remove(&previous).map(|(_, e)| e.conn)
                } else {
                    None
                };
                let replaced = self.clients.insert(
                    conn_id,
                    ClientEntry { conn, user: user.clone() },
                );
                (superseded, replaced)
            }
            Entry::Vacant(owner) => {
                owner.insert(conn_id);
                let replaced = self.clients.insert(
                    conn_id,
                    ClientEntry { conn, user: user.clone() },
                );
                (None, replaced)
            }
        };

        // This connection previously joined as someone else.
        if let Some(old) = replaced.filter(|e| e.user.user_id != user_id) {
            self.owners
                .remove_if(&old.user.user_id, |_, owner| *owner == conn_id);
        }

        if let Some(stale) = superseded {
            tracing::info!(
                user_id,
                superseded = %stale.id(),
                %conn_id,
                "closing superseded connection"
            );
            if let Err(e) = stale.close().await {
                tracing::debug!(conn_id = %stale.id(), error = %e, "close failed");
            }
        }

        tracing::info!(%conn_id, user_id, %room_id, coins = record.coins, "client joined");
        Ok(user)
    }

    /// Removes the connection's entry. Idempotent.
    pub fn remove(&self, id: ConnectionId) -> Option<GameUser> {
        let (_, entry) = self.clients.remove(&id)?;
        self.owners.remove_if(&entry.user.user_id, |_, owner| *owner == id);
        tracing::info!(conn_id = %id, user_id = %entry.user.user_id, "client removed");
        Some(entry.user)
    }

    /// A copy of the connection's game state.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the connection never joined or was
    /// removed.
    pub fn get(&self, id: ConnectionId) -> Result<GameUser, SessionError> {
        self.clients
            .get(&id)
            .map(|e| e.user.clone())
            .ok_or(SessionError::NotFound(id))
    }

    pub fn room_id_of(&self, id: ConnectionId) -> Result<RoomId, SessionError> {
        self.clients
            .get(&id)
            .map(|e| e.user.room_id)
            .ok_or(SessionError::NotFound(id))
    }

    /// The shared connection handle, if the connection is registered.
    pub fn connection(&self, id: ConnectionId) -> Option<Arc<C>> {
        self.clients.get(&id).map(|e| Arc::clone(&e.conn))
    }

    /// Connections currently registered in `room_id`, in id order.
    pub fn clients_in_room(&self, room_id: RoomId) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .clients
            .iter()
            .filter(|e| e.user.room_id == room_id)
            .map(|e| *e.key())
            .collect();
        ids.sort();
        ids
    }

    /// Connection handles and game state for everyone in `room_id`.
    pub fn members(&self, room_id: RoomId) -> Vec<(Arc<C>, GameUser)> {
        let mut members: Vec<(Arc<C>, GameUser)> = self
            .clients
            .iter()
            .filter(|e| e.user.room_id == room_id)
            .map(|e| (Arc::clone(&e.conn), e.user.clone()))
            .collect();
        members.sort_by_key(|(conn, _)| conn.id());
        members
    }

    /// Applies one typed mutation and returns the updated state.
    pub fn apply(&self, id: ConnectionId, update: UserUpdate) -> Result<GameUser, SessionError> {
        self.with_user(id, |user| user.apply(update))
    }

    /// Recomputes and stores the user's payout against `session`.
    pub fn recompute_payout(
        &self,
        id: ConnectionId,
        session: &GameSession,
    ) -> Result<GameUser, SessionError> {
        self.with_user(id, |user| {
            user.current_payout = payout::payout(session, user);
        })
    }

    /// Recomputes payout for every connection in `session`'s room.
    pub fn recompute_room_payouts(&self, session: &GameSession) {
        for id in self.clients_in_room(session.room_id) {
            if let Err(e) = self.recompute_payout(id, session) {
                tracing::debug!(conn_id = %id, error = %e, "member left before payout update");
            }
        }
    }

    /// Clears the user's counters at `level`, then recomputes payout from
    /// the zeroed state. `balance`, when known, becomes the new
    /// `initial_coins`.
    pub fn reset_user(
        &self,
        id: ConnectionId,
        session: &GameSession,
        level: ResetLevel,
        balance: Option<i64>,
    ) -> Result<GameUser, SessionError> {
        self.with_user(id, |user| {
            user.reset(level);
            if let Some(coins) = balance {
                user.initial_coins = coins;
            }
            user.current_payout = payout::payout(session, user);
        })
    }

    /// Clears the user's bet total when their profit exceeds the reset
    /// threshold, and recomputes payout.
    ///
    /// Returns the new state when a reset happened.
    pub fn check_profit_reset(
        &self,
        id: ConnectionId,
        session: &GameSession,
        rules: &GameRules,
    ) -> Result<Option<GameUser>, SessionError> {
        let mut entry = self.clients.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        let user = &mut entry.user;
        if !rules.profit_exceeds_threshold(user.user_total_profit, user.initial_coins) {
            return Ok(None);
        }
        user.user_total_bet_amount = 0;
        user.current_payout = payout::payout(session, user);
        tracing::debug!(
            conn_id = %id,
            user_id = %user.user_id,
            profit = user.user_total_profit,
            initial_coins = user.initial_coins,
            "profit threshold exceeded, bet total cleared"
        );
        Ok(Some(user.clone()))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn with_user(
        &self,
        id: ConnectionId,
        f: impl FnOnce(&mut GameUser),
    ) -> Result<GameUser, SessionError> {
        let mut entry = self.clients.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        f(&mut entry.user);
        Ok(entry.user.clone())
    }
}

impl<C: Connection> Default for ClientRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
