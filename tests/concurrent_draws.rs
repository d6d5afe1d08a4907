use std::{fs, time::Duration};

use card_drop_bot::{DrawRules, GameError, Ledger, Player, SqliteStore};
use rand::{SeedableRng, rngs::StdRng};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_user_draws_only_once_per_window() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("fanya_common.png"), b"x").unwrap();
    let store = SqliteStore::open(&dir.path().join("ledger.sqlite")).unwrap();
    let ledger = Ledger::new(store);
    let rules = DrawRules {
        cards_dir: dir.path().to_path_buf(),
        cooldown: Duration::from_secs(600),
        ..DrawRules::default()
    };

    let mut handles = Vec::new();
    for i in 0..8u64 {
        let ledger = ledger.clone();
        let rules = rules.clone();
        handles.push(tokio::spawn(async move {
            let player = Player {
                id: "42".to_string(),
                display_name: "Racer".to_string(),
            };
            let mut rng = StdRng::seed_from_u64(i);
            ledger.draw(&player, 10_000, &rules, &mut rng).await
        }));
    }

    let mut granted = 0;
    let mut cooled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(GameError::CooldownActive(_)) => cooled += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(granted, 1);
    assert_eq!(cooled, 7);

    let cards = ledger.collection("42").unwrap();
    assert_eq!(cards[0].count, 1);
    assert_eq!(ledger.account("42").unwrap().unwrap().score, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_users_draw_independently() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("fanya_common.png"), b"x").unwrap();
    let ledger = Ledger::new(SqliteStore::open(&dir.path().join("ledger.sqlite")).unwrap());
    let rules = DrawRules {
        cards_dir: dir.path().to_path_buf(),
        ..DrawRules::default()
    };

    let mut handles = Vec::new();
    for i in 0..6u64 {
        let ledger = ledger.clone();
        let rules = rules.clone();
        handles.push(tokio::spawn(async move {
            let player = Player {
                id: format!("user-{i}"),
                display_name: String::new(),
            };
            let mut rng = StdRng::seed_from_u64(i);
            ledger.draw(&player, 500, &rules, &mut rng).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(ledger.leaderboard(10).unwrap().len(), 6);
}
