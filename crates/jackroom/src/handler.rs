//! Per-connection dispatcher: read a request, route it, reply.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. Requests from one connection are handled strictly
//! in order. The loop ends when the peer closes the stream, a read fails,
//! or a frame does not decode to one of the four known requests; on the
//! way out the connection is removed from the client registry and closed.
//!
//! Errors raised while handling a single request are logged and the
//! connection stays open.

use std::sync::Arc;

use jackroom_protocol::{
    response_type, AddCoinsRequest, BetRequest, Codec, JackpotWinRequest, JoinRoomRequest,
    Request, RoomId, ServerResponse,
};
use jackroom_room::{ResetTrigger, RoomError, RoomRegistry};
use jackroom_session::{GameUser, ResetLevel, SessionError, UserUpdate};
use jackroom_store::GameStore;
use jackroom_transport::{Connection, TransportError};

use crate::JackroomError;

/// Error text for a request on a connection that never joined a room.
pub const NOT_JOINED: &str = "not joined";
/// Error text for a jackpot win by a user the store does not know.
pub const USER_NOT_FOUND: &str = "User not found";

/// Drop guard that unregisters and closes the connection when the
/// handler exits, even by panic.
struct ClientGuard<C: Connection, K: Codec, S: GameStore> {
    conn: Arc<C>,
    rooms: Arc<RoomRegistry<C, K, S>>,
}

impl<C: Connection, K: Codec, S: GameStore> Drop for ClientGuard<C, K, S> {
    fn drop(&mut self) {
        self.rooms.clients().remove(self.conn.id());
        let conn = Arc::clone(&self.conn);
        tokio::spawn(async move {
            let _ = conn.close().await;
        });
    }
}

/// Handles a single connection from accept to close.
pub async fn handle_connection<C, K, S>(
    conn: Arc<C>,
    rooms: Arc<RoomRegistry<C, K, S>>,
) -> Result<(), JackroomError>
where
    C: Connection<Error = TransportError>,
    K: Codec,
    S: GameStore,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let _guard = ClientGuard {
        conn: Arc::clone(&conn),
        rooms: Arc::clone(&rooms),
    };

    loop {
        let body = match conn.recv().await? {
            Some(body) => body,
            None => {
                tracing::info!(%conn_id, "connection closed");
                return Ok(());
            }
        };

        let request = match rooms.sender().codec().decode_request(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "protocol error, closing connection");
                return Err(e.into());
            }
        };

        let kind = request.request_type();
        tracing::debug!(%conn_id, request = kind, "request received");

        if let Err(e) = dispatch(&conn, &rooms, request).await {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!(%conn_id, request = kind, error = %e, "request failed");
        }
    }
}

async fn dispatch<C, K, S>(
    conn: &Arc<C>,
    rooms: &RoomRegistry<C, K, S>,
    request: Request,
) -> Result<(), JackroomError>
where
    C: Connection,
    K: Codec,
    S: GameStore,
{
    match request {
        Request::JoinRoom(req) => join_room(conn, rooms, req).await,
        Request::Bet(req) => bet(conn, rooms, req).await,
        Request::AddCoins(req) => add_coins(conn, rooms, req).await,
        Request::JackpotWin(req) => jackpot_win(conn, rooms, req).await,
    }
}

// ---------------------------------------------------------------------------
// Request handlers
// ---------------------------------------------------------------------------

async fn join_room<C, K, S>(
    conn: &Arc<C>,
    rooms: &RoomRegistry<C, K, S>,
    req: JoinRoomRequest,
) -> Result<(), JackroomError>
where
    C: Connection,
    K: Codec,
    S: GameStore,
{
    let room_id = RoomId(req.room_id);
    if !rooms.contains(room_id) {
        return Err(RoomError::NotFound(room_id).into());
    }

    rooms
        .clients()
        .join(Arc::clone(conn), &req.user_id, room_id, rooms.store().as_ref())
        .await?;
    let session = rooms.admit(room_id)?;

    let sender = rooms.sender();
    sender.broadcast_user_state(room_id).await;
    sender
        .send(
            conn,
            &ServerResponse::game_state(session.total_jackpot_amount, session.is_jackpot),
        )
        .await?;
    Ok(())
}

async fn bet<C, K, S>(
    conn: &Arc<C>,
    rooms: &RoomRegistry<C, K, S>,
    req: BetRequest,
) -> Result<(), JackroomError>
where
    C: Connection,
    K: Codec,
    S: GameStore,
{
    let user = joined_user(conn, rooms, response_type::BET).await?;
    let amount = i64::from(req.bet_amount);

    let update = rooms
        .store()
        .adjust_and_save(&user.user_id, -amount)
        .await?
        .ok_or_else(|| SessionError::UserNotFound(user.user_id.clone()))?;
    if !update.applied {
        tracing::warn!(
            conn_id = %conn.id(),
            user_id = %user.user_id,
            bet_amount = amount,
            coins = update.user.coins,
            "insufficient balance, bet deduction skipped"
        );
    }

    let (session, _) = rooms.record_bet(conn.id(), user.room_id, amount)?;

    let sender = rooms.sender();
    sender.send(conn, &ServerResponse::bet(update.user.coins)).await?;
    sender.broadcast_game_state(&session).await;
    sender.broadcast_user_state(user.room_id).await;
    Ok(())
}

/// Credits the user this connection joined as; the request's `user_id` is
/// not consulted, so a client can only top up its own balance.
async fn add_coins<C, K, S>(
    conn: &Arc<C>,
    rooms: &RoomRegistry<C, K, S>,
    req: AddCoinsRequest,
) -> Result<(), JackroomError>
where
    C: Connection,
    K: Codec,
    S: GameStore,
{
    let user = joined_user(conn, rooms, response_type::ADD_COINS).await?;
    let amount = i64::from(req.add_coins_amount);

    let update = rooms
        .store()
        .adjust_and_save(&user.user_id, amount)
        .await?
        .ok_or_else(|| SessionError::UserNotFound(user.user_id.clone()))?;

    rooms
        .clients()
        .apply(conn.id(), UserUpdate::AccumulateProfit(amount))?;
    if rooms.check_profit_reset(conn.id(), user.room_id)?.is_some() {
        rooms.sender().send_user_state(conn.id()).await?;
    }

    rooms
        .sender()
        .send(conn, &ServerResponse::add_coins(update.user.coins))
        .await?;
    Ok(())
}

async fn jackpot_win<C, K, S>(
    conn: &Arc<C>,
    rooms: &RoomRegistry<C, K, S>,
    req: JackpotWinRequest,
) -> Result<(), JackroomError>
where
    C: Connection,
    K: Codec,
    S: GameStore,
{
    let user = joined_user(conn, rooms, response_type::JACKPOT_WIN).await?;
    let sender = rooms.sender();

    let Some(update) = rooms
        .store()
        .adjust_and_save(&user.user_id, i64::from(req.jackpot_win_coins))
        .await?
    else {
        sender
            .send_error(conn, response_type::JACKPOT_WIN, USER_NOT_FOUND)
            .await?;
        return Err(SessionError::UserNotFound(user.user_id).into());
    };

    let coins = update.user.coins;
    rooms.reset_user(conn.id(), user.room_id, ResetLevel::Hard, Some(coins))?;
    sender.send(conn, &ServerResponse::jackpot_win(coins)).await?;

    tracing::info!(
        conn_id = %conn.id(),
        user_id = %user.user_id,
        room_id = %user.room_id,
        jackpot_type = %req.jackpot_type,
        win_coins = req.jackpot_win_coins,
        "jackpot won"
    );

    rooms.set_jackpot_flag(user.room_id, true)?;
    rooms.reset(user.room_id, ResetTrigger::Jackpot).await?;
    Ok(())
}

/// The connection's game state, or an error reply under `response_type`
/// if it never joined.
async fn joined_user<C, K, S>(
    conn: &Arc<C>,
    rooms: &RoomRegistry<C, K, S>,
    response_type: &str,
) -> Result<GameUser, JackroomError>
where
    C: Connection,
    K: Codec,
    S: GameStore,
{
    match rooms.clients().get(conn.id()) {
        Ok(user) => Ok(user),
        Err(e) => {
            rooms.sender().send_error(conn, response_type, NOT_JOINED).await?;
            Err(e.into())
        }
    }
}
