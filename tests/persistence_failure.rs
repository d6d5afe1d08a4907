use std::{fs, path::Path};

use card_drop_bot::{
    ChestKind, ChestRules, DrawRules, GameError, Ledger, Player, SqliteStore, UserAccount,
    WagerRules,
};
use rand::{SeedableRng, rngs::StdRng};
use rusqlite::Connection;

fn player() -> Player {
    Player {
        id: "13".to_string(),
        display_name: "Unlucky".to_string(),
    }
}

/// A ledger on a fresh database file holding one user with `coins`.
fn setup(dir: &Path, coins: i64) -> (Ledger, Connection, DrawRules) {
    let db = dir.join("ledger.sqlite");
    let store = SqliteStore::open(&db).unwrap();
    let mut account = UserAccount::new("13", "Unlucky");
    account.score = 40;
    account.coins = coins;
    store.save_user(&account).unwrap();

    let cards = dir.join("cards");
    fs::create_dir(&cards).unwrap();
    fs::write(cards.join("fanya_common.png"), b"x").unwrap();
    let rules = DrawRules {
        cards_dir: cards,
        ..DrawRules::default()
    };
    (Ledger::new(store), Connection::open(&db).unwrap(), rules)
}

// Reads keep working, every ownership insert fails.
fn reject_ownership_writes(conn: &Connection) {
    conn.execute_batch(
        "CREATE TRIGGER reject_grant BEFORE INSERT ON ownership
         BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
    )
    .unwrap();
}

#[tokio::test]
async fn failed_grant_leaves_account_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, conn, rules) = setup(dir.path(), 0);
    reject_ownership_writes(&conn);

    let mut rng = StdRng::seed_from_u64(1);
    let err = ledger.draw(&player(), 5_000, &rules, &mut rng).await;
    assert!(matches!(err, Err(GameError::Persistence(_))), "{err:?}");

    let account = ledger.account("13").unwrap().unwrap();
    assert_eq!(account.score, 40);
    assert_eq!(account.coins, 0);
    assert_eq!(account.last_draw_time, None);
    assert!(ledger.collection("13").unwrap().is_empty());

    // once the store recovers the same draw goes through
    conn.execute_batch("DROP TRIGGER reject_grant;").unwrap();
    let ok = ledger.draw(&player(), 5_000, &rules, &mut rng).await.unwrap();
    assert_eq!(ok.account.score, 45);
}

#[tokio::test]
async fn failed_chest_keeps_the_coins() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, conn, rules) = setup(dir.path(), 50);
    reject_ownership_writes(&conn);

    let mut rng = StdRng::seed_from_u64(2);
    let err = ledger
        .open_chest(&player(), ChestKind::Small, &ChestRules::default(), &rules, &mut rng)
        .await;
    assert!(matches!(err, Err(GameError::Persistence(_))), "{err:?}");
    assert_eq!(ledger.account("13").unwrap().unwrap().coins, 50);
}

#[tokio::test]
async fn missing_tables_fail_loudly() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, conn, rules) = setup(dir.path(), 0);
    conn.execute_batch("DROP TABLE users;").unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    let bet = ledger
        .place_bet(&player(), Some(10), 0, &WagerRules::default(), &mut rng)
        .await;
    assert!(matches!(bet, Err(GameError::Persistence(_))), "{bet:?}");
    let draw = ledger.draw(&player(), 0, &rules, &mut rng).await;
    assert!(matches!(draw, Err(GameError::Persistence(_))), "{draw:?}");
    assert!(matches!(ledger.leaderboard(5), Err(GameError::Persistence(_))));
}
