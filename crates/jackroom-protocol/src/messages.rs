//! Request and response envelopes.
//!
//! Both envelopes carry a string discriminant plus one optional field per
//! payload variant. Exactly one payload is populated on a well-formed
//! request; the discriminant names which. Responses follow the same shape
//! and may carry an `error_message` instead of a payload.
//!
//! Field tags are part of the wire contract with deployed clients. Do not
//! renumber them.

use rust_decimal::Decimal;

use crate::{ProtocolError, WireDecimal};

// ---------------------------------------------------------------------------
// Discriminants
// ---------------------------------------------------------------------------

/// Discriminants a client may send.
pub mod request_type {
    pub const JOIN_ROOM: &str = "JoinRoomRequest";
    pub const BET: &str = "BetRequest";
    pub const ADD_COINS: &str = "AddCoinsRequest";
    pub const JACKPOT_WIN: &str = "JackpotWinRequest";
}

/// Discriminants the server sends.
pub mod response_type {
    pub const GAME_STATE: &str = "GameState";
    pub const GAME_USER_STATE: &str = "GameUserState";
    pub const BET: &str = "BetResponse";
    pub const ADD_COINS: &str = "AddCoinsResponse";
    pub const JACKPOT_WIN: &str = "JackpotWinResponse";
    pub const GAME_SESSION_END: &str = "GameSessionEnd";
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct JoinRoomRequest {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(int32, tag = "2")]
    pub room_id: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BetRequest {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(int32, tag = "2")]
    pub bet_amount: i32,
    /// Sent by clients, unused by the server.
    #[prost(int32, tag = "3")]
    pub room_type: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AddCoinsRequest {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(int32, tag = "2")]
    pub add_coins_amount: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct JackpotWinRequest {
    /// Free-form label from the client (e.g. "grand"); logged only.
    #[prost(string, tag = "1")]
    pub jackpot_type: String,
    #[prost(int32, tag = "2")]
    pub jackpot_win_coins: i32,
}

/// The request envelope.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ClientRequest {
    #[prost(string, tag = "1")]
    pub request_type: String,
    #[prost(message, optional, tag = "2")]
    pub join_room_request: Option<JoinRoomRequest>,
    #[prost(message, optional, tag = "3")]
    pub bet_request: Option<BetRequest>,
    #[prost(message, optional, tag = "4")]
    pub add_coins_request: Option<AddCoinsRequest>,
    #[prost(message, optional, tag = "5")]
    pub jackpot_win_request: Option<JackpotWinRequest>,
}

/// A routed request: the payload the discriminant selected.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    JoinRoom(JoinRoomRequest),
    Bet(BetRequest),
    AddCoins(AddCoinsRequest),
    JackpotWin(JackpotWinRequest),
}

impl Request {
    /// The discriminant this request arrived under.
    pub fn request_type(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => request_type::JOIN_ROOM,
            Self::Bet(_) => request_type::BET,
            Self::AddCoins(_) => request_type::ADD_COINS,
            Self::JackpotWin(_) => request_type::JACKPOT_WIN,
        }
    }
}

impl ClientRequest {
    pub fn join_room(user_id: impl Into<String>, room_id: i32) -> Self {
        Self {
            request_type: request_type::JOIN_ROOM.into(),
            join_room_request: Some(JoinRoomRequest {
                user_id: user_id.into(),
                room_id,
            }),
            ..Default::default()
        }
    }

    pub fn bet(user_id: impl Into<String>, bet_amount: i32) -> Self {
        Self {
            request_type: request_type::BET.into(),
            bet_request: Some(BetRequest {
                user_id: user_id.into(),
                bet_amount,
                room_type: 0,
            }),
            ..Default::default()
        }
    }

    pub fn add_coins(user_id: impl Into<String>, add_coins_amount: i32) -> Self {
        Self {
            request_type: request_type::ADD_COINS.into(),
            add_coins_request: Some(AddCoinsRequest {
                user_id: user_id.into(),
                add_coins_amount,
            }),
            ..Default::default()
        }
    }

    pub fn jackpot_win(
        jackpot_type: impl Into<String>,
        jackpot_win_coins: i32,
    ) -> Self {
        Self {
            request_type: request_type::JACKPOT_WIN.into(),
            jackpot_win_request: Some(JackpotWinRequest {
                jackpot_type: jackpot_type.into(),
                jackpot_win_coins,
            }),
            ..Default::default()
        }
    }

    /// Selects the payload named by the discriminant.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownRequest`] for an unrecognized discriminant,
    /// [`ProtocolError::MissingPayload`] when the named payload is absent.
    pub fn into_request(self) -> Result<Request, ProtocolError> {
        let Self {
            request_type: kind,
            join_room_request,
            bet_request,
            add_coins_request,
            jackpot_win_request,
        } = self;

        let routed = match kind.as_str() {
            request_type::JOIN_ROOM => join_room_request.map(Request::JoinRoom),
            request_type::BET => bet_request.map(Request::Bet),
            request_type::ADD_COINS => add_coins_request.map(Request::AddCoins),
            request_type::JACKPOT_WIN => {
                jackpot_win_request.map(Request::JackpotWin)
            }
            _ => return Err(ProtocolError::UnknownRequest(kind)),
        };
        routed.ok_or(ProtocolError::MissingPayload(kind))
    }
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct GameState {
    #[prost(int64, tag = "1")]
    pub total_jackpot_amount: i64,
    #[prost(bool, tag = "2")]
    pub is_jackpot: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GameUserState {
    #[prost(message, optional, tag = "1")]
    pub current_payout: Option<WireDecimal>,
    #[prost(message, optional, tag = "2")]
    pub jackpot_prob: Option<WireDecimal>,
}

impl GameUserState {
    /// Payout as a decimal; an absent field reads as zero.
    pub fn current_payout(&self) -> Result<Decimal, ProtocolError> {
        self.current_payout
            .map_or(Ok(Decimal::ZERO), Decimal::try_from)
    }

    /// Jackpot probability as a decimal; an absent field reads as zero.
    pub fn jackpot_prob(&self) -> Result<Decimal, ProtocolError> {
        self.jackpot_prob.map_or(Ok(Decimal::ZERO), Decimal::try_from)
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BetResponse {
    #[prost(int64, tag = "1")]
    pub updated_coins: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AddCoinsResponse {
    #[prost(int64, tag = "1")]
    pub added_coins_amount: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct JackpotWinResponse {
    #[prost(int64, tag = "1")]
    pub added_coins_amount: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GameSessionEnd {
    /// Balance after the reward was credited.
    #[prost(int64, tag = "1")]
    pub rewarded_coins_amount: i64,
    #[prost(int32, tag = "2")]
    pub reward_coins: i32,
}

/// The response envelope.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ServerResponse {
    #[prost(string, tag = "1")]
    pub response_type: String,
    #[prost(message, optional, tag = "2")]
    pub game_state: Option<GameState>,
    #[prost(message, optional, tag = "3")]
    pub game_user_state: Option<GameUserState>,
    #[prost(message, optional, tag = "4")]
    pub bet_response: Option<BetResponse>,
    #[prost(message, optional, tag = "5")]
    pub add_coins_response: Option<AddCoinsResponse>,
    #[prost(message, optional, tag = "6")]
    pub jackpot_win_response: Option<JackpotWinResponse>,
    #[prost(message, optional, tag = "7")]
    pub game_session_end: Option<GameSessionEnd>,
    #[prost(string, optional, tag = "8")]
    pub error_message: Option<String>,
}

impl ServerResponse {
    pub fn game_state(total_jackpot_amount: i64, is_jackpot: bool) -> Self {
        Self {
            response_type: response_type::GAME_STATE.into(),
            game_state: Some(GameState {
                total_jackpot_amount,
                is_jackpot,
            }),
            ..Default::default()
        }
    }

    pub fn game_user_state(current_payout: Decimal, jackpot_prob: Decimal) -> Self {
        Self {
            response_type: response_type::GAME_USER_STATE.into(),
            game_user_state: Some(GameUserState {
                current_payout: Some(current_payout.into()),
                jackpot_prob: Some(jackpot_prob.into()),
            }),
            ..Default::default()
        }
    }

    pub fn bet(updated_coins: i64) -> Self {
        Self {
            response_type: response_type::BET.into(),
            bet_response: Some(BetResponse { updated_coins }),
            ..Default::default()
        }
    }

    pub fn add_coins(added_coins_amount: i64) -> Self {
        Self {
            response_type: response_type::ADD_COINS.into(),
            add_coins_response: Some(AddCoinsResponse { added_coins_amount }),
            ..Default::default()
        }
    }

    pub fn jackpot_win(added_coins_amount: i64) -> Self {
        Self {
            response_type: response_type::JACKPOT_WIN.into(),
            jackpot_win_response: Some(JackpotWinResponse { added_coins_amount }),
            ..Default::default()
        }
    }

    pub fn game_session_end(rewarded_coins_amount: i64, reward_coins: i32) -> Self {
        Self {
            response_type: response_type::GAME_SESSION_END.into(),
            game_session_end: Some(GameSessionEnd {
                rewarded_coins_amount,
                reward_coins,
            }),
            ..Default::default()
        }
    }

    /// An error reply under the discriminant of the response the client
    /// was waiting for.
    pub fn error(response_type: &str, message: impl Into<String>) -> Self {
        Self {
            response_type: response_type.into(),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }
}
