//! Outbound message fan-out.
//!
//! [`MessageSender`] encodes a [`ServerResponse`] once and writes the
//! resulting buffer to one connection or to every connection in a room.
//! A failed write to one recipient never stops delivery to the others;
//! the dead connection is cleaned up by its own handler task.

use std::sync::Arc;

use jackroom_protocol::{Codec, RoomId, ServerResponse};
use jackroom_transport::{Connection, ConnectionId};

use crate::{ClientRegistry, GameSession, SessionError};

/// Writes responses to registered connections.
pub struct MessageSender<C: Connection, K: Codec> {
    clients: Arc<ClientRegistry<C>>,
    codec: K,
}

impl<C: Connection, K: Codec> MessageSender<C, K> {
    pub fn new(clients: Arc<ClientRegistry<C>>, codec: K) -> Self {
        Self { clients, codec }
    }

    pub fn codec(&self) -> &K {
        &self.codec
    }

    /// Writes `response` to `conn`, whether or not it has joined.
    pub async fn send(&self, conn: &C, response: &ServerResponse) -> Result<(), SessionError> {
        let frame = self.codec.encode(response);
        write(conn, &frame).await
    }

    /// Writes `response` to a registered connection.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if `id` is not registered.
    pub async fn send_to(
        &self,
        id: ConnectionId,
        response: &ServerResponse,
    ) -> Result<(), SessionError> {
        let conn = self.clients.connection(id).ok_or(SessionError::NotFound(id))?;
        self.send(&conn, response).await
    }

    /// Writes an error reply carrying `response_type` so the client can
    /// match it to the request it sent.
    pub async fn send_error(
        &self,
        conn: &C,
        response_type: &str,
        message: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.send(conn, &ServerResponse::error(response_type, message)).await
    }

    /// Writes `response` to every connection in `room_id`.
    ///
    /// Returns how many writes succeeded.
    pub async fn broadcast(&self, room_id: RoomId, response: &ServerResponse) -> usize {
        let frame = self.codec.encode(response);
        let mut delivered = 0;
        for (conn, _) in self.clients.members(room_id) {
            match write(conn.as_ref(), &frame).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::debug!(%room_id, error = %e, "broadcast write failed"),
            }
        }
        delivered
    }

    /// Sends the connection its own payout and jackpot probability.
    pub async fn send_user_state(&self, id: ConnectionId) -> Result<(), SessionError> {
        let user = self.clients.get(id)?;
        let response = ServerResponse::game_user_state(user.current_payout, user.jackpot_prob);
        self.send_to(id, &response).await
    }

    /// Sends every connection in `room_id` its own user state.
    ///
    /// Each recipient gets a distinct message, so nothing is shared
    /// between the writes.
    pub async fn broadcast_user_state(&self, room_id: RoomId) {
        for (conn, user) in self.clients.members(room_id) {
            let response =
                ServerResponse::game_user_state(user.current_payout, user.jackpot_prob);
            if let Err(e) = self.send(&conn, &response).await {
                tracing::debug!(%room_id, error = %e, "user state write failed");
            }
        }
    }

    /// Sends the room's jackpot pool and flag to everyone in it.
    pub async fn broadcast_game_state(&self, session: &GameSession) -> usize {
        let response =
            ServerResponse::game_state(session.total_jackpot_amount, session.is_jackpot);
        self.broadcast(session.room_id, &response).await
    }
}

async fn write<C: Connection>(conn: &C, frame: &[u8]) -> Result<(), SessionError> {
    conn.send(frame).await.map_err(|e| SessionError::SendFailed {
        id: conn.id(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use jackroom_protocol::{response_type, ProstCodec};
    use jackroom_store::{MemoryStore, RoomConfig};
    use jackroom_transport::MockConnection;
    use prost::Message;
    use rust_decimal::Decimal;

    use super::*;
    use crate::UserUpdate;

    fn decode_all(conn: &MockConnection) -> Vec<ServerResponse> {
        conn.take_sent()
            .iter()
            .map(|f| ServerResponse::decode_length_delimited(f.as_slice()).unwrap())
            .collect()
    }

    async fn setup() -> (
        MessageSender<MockConnection, ProstCodec>,
        Arc<ClientRegistry<MockConnection>>,
        Arc<MockConnection>,
        Arc<MockConnection>,
    ) {
        let store = MemoryStore::new();
        store.insert_user("alice", 1_000);
        store.insert_user("bob", 2_000);
        let clients = Arc::new(ClientRegistry::new());
        let a = Arc::new(MockConnection::new());
        let b = Arc::new(MockConnection::new());
        clients.join(Arc::clone(&a), "alice", RoomId(1), &store).await.unwrap();
        clients.join(Arc::clone(&b), "bob", RoomId(1), &store).await.unwrap();
        let sender = MessageSender::new(Arc::clone(&clients), ProstCodec);
        (sender, clients, a, b)
    }

    #[tokio::test]
    async fn test_send_to_unregistered_returns_not_found() {
        let (sender, ..) = setup().await;
        let err = sender
            .send_to(ConnectionId::new(1), &ServerResponse::bet(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_member() {
        let (sender, _, a, b) = setup().await;

        let delivered = sender.broadcast(RoomId(1), &ServerResponse::game_state(10, false)).await;

        assert_eq!(delivered, 2);
        assert_eq!(decode_all(&a), vec![ServerResponse::game_state(10, false)]);
        assert_eq!(decode_all(&b), vec![ServerResponse::game_state(10, false)]);
    }

    #[tokio::test]
    async fn test_broadcast_skips_failed_recipient() {
        let (sender, _, a, b) = setup().await;
        a.fail_sends(true);

        let delivered = sender.broadcast(RoomId(1), &ServerResponse::game_state(0, true)).await;

        assert_eq!(delivered, 1);
        assert!(a.sent_frames().is_empty());
        assert_eq!(decode_all(&b).len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_user_state_sends_each_their_own() {
        let (sender, clients, a, b) = setup().await;
        clients
            .apply(a.id(), UserUpdate::SetPayout(Decimal::new(25, 3)))
            .unwrap();

        sender.broadcast_user_state(RoomId(1)).await;

        let to_a = decode_all(&a);
        let to_b = decode_all(&b);
        assert_eq!(to_a[0].response_type, response_type::GAME_USER_STATE);
        let state_a = to_a[0].game_user_state.as_ref().unwrap();
        let state_b = to_b[0].game_user_state.as_ref().unwrap();
        assert_eq!(state_a.current_payout().unwrap(), Decimal::new(25, 3));
        assert_eq!(state_b.current_payout().unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_send_error_carries_discriminant_and_message() {
        let (sender, _, a, _) = setup().await;

        sender
            .send_error(&a, response_type::JACKPOT_WIN, "User not found")
            .await
            .unwrap();

        let sent = decode_all(&a);
        assert_eq!(sent[0].response_type, response_type::JACKPOT_WIN);
        assert_eq!(sent[0].error_message.as_deref(), Some("User not found"));
    }

    #[tokio::test]
    async fn test_broadcast_game_state_uses_session_pool() {
        let (sender, _, a, _) = setup().await;
        let mut session = GameSession::new(&RoomConfig {
            room_id: RoomId(1),
            target_payout: Decimal::new(95, 2),
            max_bet_amount: 100_000,
            max_user: 10,
            base_jackpot_amount: 700,
        });
        session.is_jackpot = true;

        sender.broadcast_game_state(&session).await;

        assert_eq!(decode_all(&a), vec![ServerResponse::game_state(700, true)]);
    }

    #[tokio::test]
    async fn test_send_closed_connection_returns_send_failed() {
        let (sender, _, a, _) = setup().await;
        a.close().await.unwrap();

        let err = sender.send(&a, &ServerResponse::bet(1)).await.unwrap_err();
        assert!(matches!(err, SessionError::SendFailed { id, .. } if id == a.id()));
    }
}
