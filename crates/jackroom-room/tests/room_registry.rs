//! Integration tests for the room registry and the reset protocol.
//!
//! Connections are `MockConnection`s; the store is a `MemoryStore`. Timer
//! tests run with `start_paused = true` so a 60 s period elapses instantly.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use jackroom_protocol::{response_type, ProstCodec, RoomId, ServerResponse};
use jackroom_room::{ResetTrigger, RoomError, RoomRegistry};
use jackroom_session::{payout, ClientRegistry, GameRules, MessageSender, SessionError};
use jackroom_store::{
    BalanceStore, BalanceUpdate, GameRecordSnapshot, GameRecordStore, MemoryStore, RoomConfig,
    RoomConfigStore, StoreError, UserRecord,
};
use jackroom_timer::TimerConfig;
use jackroom_transport::{Connection, MockConnection};
use prost::Message;
use rust_decimal::Decimal;

// =========================================================================
// Helpers
// =========================================================================

type Rooms = RoomRegistry<MockConnection, ProstCodec, MemoryStore>;

const ROOM: RoomId = RoomId(1);
const BASE_JACKPOT: i64 = 5_000;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn room_config(room_id: i32, max_user: i32) -> RoomConfig {
    RoomConfig {
        room_id: RoomId(room_id),
        target_payout: dec("0.95"),
        max_bet_amount: 100_000,
        max_user,
        base_jackpot_amount: BASE_JACKPOT,
    }
}

async fn setup() -> (Arc<Rooms>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.insert_room(room_config(1, 10));
    store.insert_room(room_config(2, 10));
    store.insert_room(room_config(3, 0));
    store.insert_user("alice", 10_000);
    store.insert_user("bob", 20_000);

    let clients = Arc::new(ClientRegistry::new());
    let sender = Arc::new(MessageSender::new(Arc::clone(&clients), ProstCodec));
    let rooms = RoomRegistry::new(
        clients,
        sender,
        Arc::clone(&store),
        GameRules::default(),
        TimerConfig::with_period(Duration::from_secs(60)),
    );
    rooms.initialize_rooms().await.unwrap();
    (rooms, store)
}

async fn join(rooms: &Rooms, store: &MemoryStore, user: &str, room: RoomId) -> Arc<MockConnection> {
    let conn = Arc::new(MockConnection::new());
    rooms.clients().join(Arc::clone(&conn), user, room, store).await.unwrap();
    rooms.admit(room).unwrap();
    conn
}

/// A `MemoryStore` whose room lookups take a second, so a reset holds the
/// reset guard long enough for the room timer to fire mid-reset.
#[derive(Default)]
struct SlowStore {
    inner: MemoryStore,
    saves: AtomicUsize,
}

impl SlowStore {
    fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl BalanceStore for SlowStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.inner.get_user(user_id).await
    }

    async fn adjust_and_save(
        &self,
        user_id: &str,
        delta: i64,
    ) -> Result<Option<BalanceUpdate>, StoreError> {
        self.inner.adjust_and_save(user_id, delta).await
    }
}

impl RoomConfigStore for SlowStore {
    async fn get_all_rooms(&self) -> Result<Vec<RoomConfig>, StoreError> {
        self.inner.get_all_rooms().await
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Option<RoomConfig>, StoreError> {
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.inner.get_room(room_id).await
    }
}

impl GameRecordStore for SlowStore {
    async fn get_record(&self, room_id: RoomId) -> Result<Option<GameRecordSnapshot>, StoreError> {
        self.inner.get_record(room_id).await
    }

    async fn save_record(&self, record: GameRecordSnapshot) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_record(record).await
    }
}

async fn setup_slow() -> (Arc<RoomRegistry<MockConnection, ProstCodec, SlowStore>>, Arc<SlowStore>) {
    let store = Arc::new(SlowStore::default());
    store.inner.insert_room(room_config(1, 10));
    let clients = Arc::new(ClientRegistry::new());
    let sender = Arc::new(MessageSender::new(Arc::clone(&clients), ProstCodec));
    let rooms = RoomRegistry::new(
        clients,
        sender,
        Arc::clone(&store),
        GameRules::default(),
        TimerConfig::with_period(Duration::from_secs(60)),
    );
    rooms.initialize_rooms().await.unwrap();
    (rooms, store)
}

fn decode(conn: &MockConnection) -> Vec<ServerResponse> {
    conn.take_sent()
        .iter()
        .map(|f| ServerResponse::decode_length_delimited(f.as_slice()).unwrap())
        .collect()
}

// =========================================================================
// initialize_rooms() / get_session()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_initialize_rooms_skips_invalid_config() {
    let (rooms, _) = setup().await;

    assert_eq!(rooms.room_ids(), vec![RoomId(1), RoomId(2)]);
    assert!(matches!(rooms.get_session(RoomId(3)), Err(RoomError::NotFound(RoomId(3)))));
}

#[tokio::test(start_paused = true)]
async fn test_initialize_rooms_starts_every_timer() {
    let (rooms, _) = setup().await;
    assert!(rooms.is_timer_running(RoomId(1)).unwrap());
    assert!(rooms.is_timer_running(RoomId(2)).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_new_session_starts_at_base_jackpot() {
    let (rooms, _) = setup().await;
    let session = rooms.get_session(ROOM).unwrap();
    assert_eq!(session.total_jackpot_amount, BASE_JACKPOT);
    assert_eq!(session.total_user, 0);
    assert!(!session.is_jackpot);
}

#[tokio::test(start_paused = true)]
async fn test_get_session_unconfigured_room_returns_not_found() {
    let (rooms, _) = setup().await;
    assert!(matches!(rooms.get_session(RoomId(42)), Err(RoomError::NotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn test_increment_total_user_and_set_jackpot_flag() {
    let (rooms, _) = setup().await;

    assert_eq!(rooms.increment_total_user(ROOM).unwrap(), 1);
    assert_eq!(rooms.increment_total_user(ROOM).unwrap(), 2);
    rooms.set_jackpot_flag(ROOM, true).unwrap();

    let session = rooms.get_session(ROOM).unwrap();
    assert_eq!(session.total_user, 2);
    assert!(session.is_jackpot);
}

// =========================================================================
// admit() / record_bet()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_admit_recomputes_every_member_payout() {
    let (rooms, store) = setup().await;
    let alice = join(&rooms, &store, "alice", ROOM).await;
    let bob = join(&rooms, &store, "bob", ROOM).await;

    // Alice's payout feeds back: (0.95 - 0.02375) / 2 × 0.2 / 2
    let alice_state = rooms.clients().get(alice.id()).unwrap();
    assert_eq!(alice_state.current_payout, dec("0.0463125"));
    // Bob starts from zero: 0.475 × 0.2 / 2
    let bob_state = rooms.clients().get(bob.id()).unwrap();
    assert_eq!(bob_state.current_payout, dec("0.0475"));
}

#[tokio::test(start_paused = true)]
async fn test_record_bet_updates_user_room_and_pool() {
    let (rooms, store) = setup().await;
    let alice = join(&rooms, &store, "alice", ROOM).await;

    let (session, user) = rooms.record_bet(alice.id(), ROOM, 1_000).unwrap();

    assert_eq!(session.total_bet_amount, 1_000);
    assert_eq!(session.total_jackpot_amount, BASE_JACKPOT + 100);
    assert_eq!(user.bet_count, 1);
    assert_eq!(user.user_total_bet_amount, 1_000);
    assert_eq!(user.user_session_bet_amount, 1_000);
    // Joining already stored a payout of 0.02375, which feeds back:
    // (0.95 - 0.02375) / 2 × (0.01 + 0.1) / 2 = 0.025471875.
    // From a zero payout the same bet would give 0.475 × 0.11 / 2 = 0.026125.
    assert_eq!(user.current_payout, dec("0.025471875"));
    let mut from_zero = user.clone();
    from_zero.current_payout = Decimal::ZERO;
    assert_eq!(payout::payout(&session, &from_zero), dec("0.026125"));
    assert_eq!(user.jackpot_prob, payout::jackpot_prob(1));
}

#[tokio::test(start_paused = true)]
async fn test_record_bet_unjoined_connection_leaves_session_untouched() {
    let (rooms, _) = setup().await;
    let stranger = MockConnection::new();

    let err = rooms.record_bet(stranger.id(), ROOM, 1_000).unwrap_err();

    assert!(matches!(err, RoomError::Session(SessionError::NotFound(_))));
    assert_eq!(rooms.get_session(ROOM).unwrap().total_bet_amount, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_record_bet_concurrent_bets_lose_no_updates() {
    let (rooms, store) = setup().await;
    let alice = join(&rooms, &store, "alice", ROOM).await;
    let bob = join(&rooms, &store, "bob", ROOM).await;

    let mut tasks = Vec::new();
    for conn in [alice.id(), bob.id()] {
        let rooms = Arc::clone(&rooms);
        tasks.push(tokio::spawn(async move {
            for _ in 0..100 {
                rooms.record_bet(conn, ROOM, 10).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    let session = rooms.get_session(ROOM).unwrap();
    assert_eq!(session.total_bet_amount, 2_000);
    assert_eq!(session.total_jackpot_amount, BASE_JACKPOT + 200);
    assert_eq!(rooms.clients().get(alice.id()).unwrap().bet_count, 100);
    assert_eq!(rooms.clients().get(bob.id()).unwrap().bet_count, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_record_bet_one_room_unaffected_by_resets_in_another() {
    let (rooms, store) = setup().await;
    let alice = join(&rooms, &store, "alice", ROOM).await;
    let bob = join(&rooms, &store, "bob", RoomId(2)).await;

    let mut tasks = Vec::new();
    {
        let rooms = Arc::clone(&rooms);
        let alice = alice.id();
        tasks.push(tokio::spawn(async move {
            for _ in 0..200 {
                rooms.record_bet(alice, ROOM, 10).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    {
        let rooms = Arc::clone(&rooms);
        let bob = bob.id();
        tasks.push(tokio::spawn(async move {
            for _ in 0..200 {
                rooms.record_bet(bob, RoomId(2), 10).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    {
        let rooms = Arc::clone(&rooms);
        tasks.push(tokio::spawn(async move {
            for _ in 0..20 {
                rooms.reset(RoomId(2), ResetTrigger::Timer).await.unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::time::timeout(Duration::from_secs(10), async {
        for t in tasks {
            t.await.unwrap();
        }
    })
    .await
    .expect("bets and resets should finish without blocking each other");

    let session = rooms.get_session(ROOM).unwrap();
    assert_eq!(session.total_bet_amount, 2_000);
    assert_eq!(session.total_jackpot_amount, BASE_JACKPOT + 200);
    let alice_state = rooms.clients().get(alice.id()).unwrap();
    assert_eq!(alice_state.bet_count, 200);
    assert_eq!(alice_state.user_total_bet_amount, 2_000);
    assert_eq!(store.coins("alice"), Some(10_000));
    assert!(store.get_record(ROOM).await.unwrap().is_none());

    // Soft resets keep the bet count.
    assert_eq!(rooms.clients().get(bob.id()).unwrap().bet_count, 200);
    assert!(store.get_record(RoomId(2)).await.unwrap().is_some());
}

// =========================================================================
// reset()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_reset_timer_rewards_and_soft_resets_members() {
    let (rooms, store) = setup().await;
    let alice = join(&rooms, &store, "alice", ROOM).await;
    rooms.record_bet(alice.id(), ROOM, 1_000).unwrap();
    let before = rooms.get_session(ROOM).unwrap();
    decode(&alice);

    let after = rooms.reset(ROOM, ResetTrigger::Timer).await.unwrap();

    // 10 % of the session bets.
    assert_eq!(store.coins("alice"), Some(10_100));

    let sent = decode(&alice);
    assert_eq!(sent[0].response_type, response_type::GAME_SESSION_END);
    assert_eq!(sent[0], ServerResponse::game_session_end(10_100, 100));
    assert_eq!(sent[1].response_type, response_type::GAME_USER_STATE);

    let user = rooms.clients().get(alice.id()).unwrap();
    assert_eq!(user.bet_count, 1);
    assert_eq!(user.user_total_bet_amount, 0);
    assert_eq!(user.user_session_bet_amount, 0);
    assert_eq!(user.initial_coins, 10_100);

    assert_ne!(after.game_id, before.game_id);
    assert_eq!(after.total_bet_amount, 0);
    assert_eq!(after.total_user, 1);
    assert!(!after.is_jackpot);
    assert_eq!(after.total_jackpot_amount, BASE_JACKPOT + 100);
    assert_eq!(rooms.get_session(ROOM).unwrap(), after);
}

#[tokio::test(start_paused = true)]
async fn test_reset_persists_pre_reset_snapshot() {
    let (rooms, store) = setup().await;
    let alice = join(&rooms, &store, "alice", ROOM).await;
    rooms.record_bet(alice.id(), ROOM, 2_500).unwrap();

    rooms.reset(ROOM, ResetTrigger::Timer).await.unwrap();

    let record = store.get_record(ROOM).await.unwrap().unwrap();
    assert_eq!(record.total_bet_amount, 2_500);
    assert_eq!(record.total_user, 1);
    assert!(!record.is_jackpot);
}

#[tokio::test(start_paused = true)]
async fn test_reset_jackpot_restarts_pool_and_sets_flag() {
    let (rooms, store) = setup().await;
    let alice = join(&rooms, &store, "alice", ROOM).await;
    rooms.record_bet(alice.id(), ROOM, 1_000).unwrap();
    rooms.set_jackpot_flag(ROOM, true).unwrap();

    let after = rooms.reset(ROOM, ResetTrigger::Jackpot).await.unwrap();

    assert!(after.is_jackpot);
    assert_eq!(after.total_jackpot_amount, BASE_JACKPOT);
    let record = store.get_record(ROOM).await.unwrap().unwrap();
    assert!(record.is_jackpot);
    assert_eq!(record.total_jackpot_amount, BASE_JACKPOT + 100);
}

#[tokio::test(start_paused = true)]
async fn test_reset_rewards_each_user_from_own_bets() {
    let (rooms, store) = setup().await;
    let alice = join(&rooms, &store, "alice", ROOM).await;
    let bob = join(&rooms, &store, "bob", ROOM).await;
    rooms.record_bet(alice.id(), ROOM, 1_000).unwrap();
    rooms.record_bet(bob.id(), ROOM, 50).unwrap();

    rooms.reset(ROOM, ResetTrigger::Timer).await.unwrap();

    assert_eq!(store.coins("alice"), Some(10_100));
    assert_eq!(store.coins("bob"), Some(20_005));
}

#[tokio::test(start_paused = true)]
async fn test_reset_empty_room_still_persists() {
    let (rooms, store) = setup().await;

    let after = rooms.reset(RoomId(2), ResetTrigger::Timer).await.unwrap();

    assert_eq!(after.total_user, 0);
    assert!(store.get_record(RoomId(2)).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_reset_leaves_other_rooms_alone() {
    let (rooms, store) = setup().await;
    let bob = join(&rooms, &store, "bob", RoomId(2)).await;
    rooms.record_bet(bob.id(), RoomId(2), 100).unwrap();
    decode(&bob);

    rooms.reset(ROOM, ResetTrigger::Timer).await.unwrap();

    assert!(decode(&bob).is_empty());
    assert_eq!(rooms.get_session(RoomId(2)).unwrap().total_bet_amount, 100);
}

#[tokio::test(start_paused = true)]
async fn test_reset_unknown_room_returns_not_found() {
    let (rooms, _) = setup().await;
    let err = rooms.reset(RoomId(9), ResetTrigger::Timer).await.unwrap_err();
    assert!(matches!(err, RoomError::NotFound(RoomId(9))));
}

// =========================================================================
// Timers
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_timer_fires_periodic_reset() {
    let (rooms, store) = setup().await;
    let alice = join(&rooms, &store, "alice", ROOM).await;
    rooms.record_bet(alice.id(), ROOM, 1_000).unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(store.coins("alice"), Some(10_100));
    assert_eq!(rooms.get_session(ROOM).unwrap().total_bet_amount, 0);
    assert!(store.get_record(ROOM).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_jackpot_reset_restarts_period() {
    let (rooms, _) = setup().await;

    tokio::time::sleep(Duration::from_secs(40)).await;
    let after_jackpot = rooms.reset(ROOM, ResetTrigger::Jackpot).await.unwrap();

    // The original 60 s deadline passes without a reset.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(rooms.get_session(ROOM).unwrap().game_id, after_jackpot.game_id);

    // 40 + 60 = 100 s.
    tokio::time::sleep(Duration::from_secs(31)).await;
    let after_timer = rooms.get_session(ROOM).unwrap();
    assert_ne!(after_timer.game_id, after_jackpot.game_id);
    assert!(!after_timer.is_jackpot);
}

#[tokio::test(start_paused = true)]
async fn test_timer_firing_during_jackpot_reset_is_skipped() {
    let (rooms, store) = setup_slow().await;

    // The jackpot reset holds the guard from 59.5 s to 60.5 s; the timer
    // fires at 60 s and waits behind it.
    tokio::time::sleep(Duration::from_millis(59_500)).await;
    let jackpot = {
        let rooms = Arc::clone(&rooms);
        tokio::spawn(async move { rooms.reset(ROOM, ResetTrigger::Jackpot).await })
    };
    let after_jackpot = jackpot.await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(store.saves(), 1);
    let session = rooms.get_session(ROOM).unwrap();
    assert_eq!(session.game_id, after_jackpot.game_id);
    assert!(session.is_jackpot);

    // One full period after the jackpot reset: 60.5 + 60 s, plus the slow
    // room lookup.
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(store.saves(), 2);
    assert!(!rooms.get_session(ROOM).unwrap().is_jackpot);
}

#[tokio::test(start_paused = true)]
async fn test_start_timer_is_idempotent() {
    let (rooms, _) = setup().await;

    assert!(!rooms.start_timer(ROOM).unwrap());
    assert!(rooms.stop_timer(ROOM).unwrap());
    assert!(!rooms.stop_timer(ROOM).unwrap());
    assert!(rooms.start_timer(ROOM).unwrap());
    assert!(rooms.is_timer_running(ROOM).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_stopped_timer_never_resets() {
    let (rooms, _) = setup().await;
    let before = rooms.get_session(ROOM).unwrap();
    rooms.stop_timer(ROOM).unwrap();

    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(rooms.get_session(ROOM).unwrap().game_id, before.game_id);
}

#[tokio::test(start_paused = true)]
async fn test_reset_restarts_stopped_timer() {
    let (rooms, _) = setup().await;
    rooms.stop_timer(ROOM).unwrap();

    rooms.reset(ROOM, ResetTrigger::Jackpot).await.unwrap();

    assert!(rooms.is_timer_running(ROOM).unwrap());
}
