//! Loading a `MemoryStore` from a seed file on disk.

use std::path::PathBuf;

use jackroom_protocol::RoomId;
use jackroom_store::{
    BalanceStore, GameRecordStore, MemoryStore, RoomConfigStore, StoreError,
};

fn write_seed(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "jackroom-store-{}-{name}.json",
        std::process::id()
    ));
    std::fs::write(&path, contents).expect("temp dir should be writable");
    path
}

#[tokio::test]
async fn test_load_seed_file_populates_all_tables() {
    let path = write_seed(
        "full",
        r#"{
            "rooms": [
                { "roomId": 2, "targetPayout": "0.9", "maxBetAmount": 5000, "maxUser": 4, "baseJackpotAmount": 700 },
                { "roomId": 1, "targetPayout": 0.95, "maxBetAmount": 100000, "maxUser": 10 }
            ],
            "users": [ { "userId": "alice", "coins": 1200 } ],
            "records": [
                { "roomId": 1, "totalBetAmount": 900, "totalUser": 3, "isJackpot": true }
            ]
        }"#,
    );

    let store = MemoryStore::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let rooms = store.get_all_rooms().await.unwrap();
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].room_id, RoomId(1));
    assert_eq!(rooms[1].base_jackpot_amount, 700);

    let alice = store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(alice.coins, 1200);

    let record = store.get_record(RoomId(1)).await.unwrap().unwrap();
    assert_eq!(record.total_bet_amount, 900);
    assert!(record.is_jackpot);
    assert!(store.get_record(RoomId(2)).await.unwrap().is_none());
}

#[test]
fn test_load_missing_file_returns_io_error() {
    let err = MemoryStore::load("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
}

#[test]
fn test_load_malformed_seed_returns_seed_error() {
    let path = write_seed("broken", "{ \"rooms\": 5 }");
    let err = MemoryStore::load(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, StoreError::Seed(_)));
}
