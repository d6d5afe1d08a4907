use std::{fs, path::Path, time::Duration};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row, params};

use crate::{
    catalog::CardDefinition,
    error::StoreError,
    ledger::{OwnedCard, UserAccount},
    rarity::{Rarity, parse_rarity},
};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    user_id         TEXT PRIMARY KEY,
    display_name    TEXT NOT NULL DEFAULT '',
    score           INTEGER NOT NULL DEFAULT 0,
    coins           INTEGER NOT NULL DEFAULT 0,
    last_draw_time  INTEGER,
    last_wager_time INTEGER
);
CREATE TABLE IF NOT EXISTS ownership (
    user_id   TEXT NOT NULL,
    card_name TEXT NOT NULL,
    rarity    TEXT NOT NULL,
    count     INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (user_id, card_name)
);
CREATE INDEX IF NOT EXISTS users_score_idx ON users (score DESC);
";

const UPSERT_USER: &str = "
INSERT INTO users (user_id, display_name, score, coins, last_draw_time, last_wager_time)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(user_id) DO UPDATE SET
    display_name = excluded.display_name,
    score = excluded.score,
    coins = excluded.coins,
    last_draw_time = excluded.last_draw_time,
    last_wager_time = excluded.last_wager_time
";

const USER_COLUMNS: &str =
    "user_id, display_name, score, coins, last_draw_time, last_wager_time";

/// SQLite-backed ledger store. Cloning shares the same pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let manager =
            SqliteConnectionManager::file(path).with_init(|c| c.busy_timeout(Duration::from_secs(5)));
        let pool = Pool::builder().max_size(8).build(manager)?;
        Self::from_pool(pool)
    }

    /// A private in-memory database. The pool holds a single connection so
    /// every caller sees the same data.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Self::from_pool(pool)
    }

    pub fn from_pool(pool: DbPool) -> Result<Self, StoreError> {
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA)?;
        drop(conn);
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<DbConnection, StoreError> {
        Ok(self.pool.get()?)
    }

    pub fn load_user(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1");
        let account = conn
            .query_row(&sql, params![user_id], user_from_row)
            .optional()?;
        Ok(account)
    }

    /// How many copies of `card_name` the user holds, 0 if none.
    pub fn owned_count(&self, user_id: &str, card_name: &str) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        let count = conn
            .query_row(
                "SELECT count FROM ownership WHERE user_id = ?1 AND card_name = ?2",
                params![user_id, card_name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    pub fn save_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        let conn = self.conn()?;
        upsert_user(&conn, account)?;
        Ok(())
    }

    /// Write the updated account and add one copy of `card` in a single
    /// transaction. Returns the new owned count. The tier recorded on first
    /// acquisition is kept.
    pub fn commit_grant(
        &self,
        account: &UserAccount,
        card: &CardDefinition,
    ) -> Result<i64, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        upsert_user(&tx, account)?;
        tx.execute(
            "INSERT INTO ownership (user_id, card_name, rarity, count) VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(user_id, card_name) DO UPDATE SET count = count + 1",
            params![account.user_id, card.name, card.rarity.as_str()],
        )?;
        let count = tx.query_row(
            "SELECT count FROM ownership WHERE user_id = ?1 AND card_name = ?2",
            params![account.user_id, card.name],
            |row| row.get::<_, i64>(0),
        )?;
        tx.commit()?;
        Ok(count)
    }

    /// Owned cards, rarest tier first, then by name.
    pub fn collection(&self, user_id: &str) -> Result<Vec<OwnedCard>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT card_name, rarity, count FROM ownership WHERE user_id = ?1")?;
        let rows = stmt.query_map(params![user_id], |row| {
            let rarity: String = row.get(1)?;
            Ok(OwnedCard {
                name: row.get(0)?,
                rarity: parse_rarity(&rarity).unwrap_or(Rarity::Common),
                count: row.get(2)?,
            })
        })?;
        let mut cards = rows.collect::<Result<Vec<_>, _>>()?;
        cards.sort_by(|a, b| b.rarity.cmp(&a.rarity).then_with(|| a.name.cmp(&b.name)));
        Ok(cards)
    }

    /// Highest scores first, ties broken by user id.
    pub fn top_by_score(&self, limit: usize) -> Result<Vec<UserAccount>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY score DESC, user_id ASC LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], user_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn upsert_user(conn: &rusqlite::Connection, account: &UserAccount) -> rusqlite::Result<usize> {
    conn.execute(
        UPSERT_USER,
        params![
            account.user_id,
            account.display_name,
            account.score,
            account.coins,
            account.last_draw_time,
            account.last_wager_time,
        ],
    )
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        user_id: row.get(0)?,
        display_name: row.get(1)?,
        score: row.get(2)?,
        coins: row.get(3)?,
        last_draw_time: row.get(4)?,
        last_wager_time: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, rarity: Rarity) -> CardDefinition {
        CardDefinition {
            name: name.to_string(),
            rarity,
        }
    }

    #[test]
    fn unknown_user_loads_as_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load_user("42").unwrap().is_none());
        assert_eq!(store.owned_count("42", "Fanya").unwrap(), 0);
    }

    #[test]
    fn commit_grant_upserts_and_counts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut acc = UserAccount::new("1", "Ann");
        acc.score = 5;
        assert_eq!(store.commit_grant(&acc, &card("Fanya", Rarity::Common)).unwrap(), 1);
        acc.score = 10;
        assert_eq!(store.commit_grant(&acc, &card("Fanya", Rarity::Common)).unwrap(), 2);

        let loaded = store.load_user("1").unwrap().unwrap();
        assert_eq!(loaded.score, 10);
        assert_eq!(loaded.display_name, "Ann");
        assert_eq!(store.owned_count("1", "Fanya").unwrap(), 2);
    }

    #[test]
    fn first_recorded_tier_is_kept() {
        let store = SqliteStore::open_in_memory().unwrap();
        let acc = UserAccount::new("1", "Ann");
        store.commit_grant(&acc, &card("Fanya", Rarity::Rare)).unwrap();
        store.commit_grant(&acc, &card("Fanya", Rarity::Common)).unwrap();
        let cards = store.collection("1").unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].rarity, Rarity::Rare);
        assert_eq!(cards[0].count, 2);
    }

    #[test]
    fn collection_is_sorted_rarest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let acc = UserAccount::new("1", "Ann");
        store.commit_grant(&acc, &card("Zed", Rarity::Common)).unwrap();
        store.commit_grant(&acc, &card("Alpha", Rarity::Common)).unwrap();
        store.commit_grant(&acc, &card("Crown", Rarity::Legendary)).unwrap();
        let names: Vec<String> = store
            .collection("1")
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Crown", "Alpha", "Zed"]);
    }

    #[test]
    fn leaderboard_orders_by_score_then_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (id, score) in [("b", 50), ("a", 50), ("c", 70), ("d", 10)] {
            let mut acc = UserAccount::new(id, id);
            acc.score = score;
            store.save_user(&acc).unwrap();
        }
        let ids: Vec<String> = store
            .top_by_score(3)
            .unwrap()
            .into_iter()
            .map(|a| a.user_id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cards.sqlite");
        {
            let store = SqliteStore::open(&path).unwrap();
            let mut acc = UserAccount::new("7", "Bo");
            acc.coins = 3;
            acc.last_draw_time = Some(1_000);
            store.save_user(&acc).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let acc = store.load_user("7").unwrap().unwrap();
        assert_eq!(acc.coins, 3);
        assert_eq!(acc.last_draw_time, Some(1_000));
        assert_eq!(acc.last_wager_time, None);
    }
}
