use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use rand::Rng;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    catalog::{CardDefinition, CatalogEntry, scan_catalog},
    chest::{ChestKind, ChestRules, check_affordable},
    cooldown::check_cooldown,
    error::{GameError, GameResult, StoreError},
    rarity::{Rarity, TierTable, TierValues},
    sampler::{FallbackPolicy, pick_card},
    storage::SqliteStore,
    wager::{
        ArcadeGame, PendingWager, WagerKind, WagerOutcome, WagerRules, apply_delta,
        resolve_arcade, resolve_bet, roll_die,
    },
};

/// The Telegram user behind a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub display_name: String,
}

/// Persistent per-user balances and cooldown timestamps (unix seconds).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAccount {
    pub user_id: String,
    pub display_name: String,
    pub score: i64,
    pub coins: i64,
    pub last_draw_time: Option<i64>,
    pub last_wager_time: Option<i64>,
}

impl UserAccount {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            score: 0,
            coins: 0,
            last_draw_time: None,
            last_wager_time: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedCard {
    pub name: String,
    pub rarity: Rarity,
    pub count: i64,
}

/// What one acquisition of a card is worth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grant {
    pub is_new: bool,
    pub points_delta: i64,
    pub coins_delta: i64,
    /// Copies owned after this grant.
    pub owned_count: i64,
}

/// Points are paid for every copy, coins only for the first one.
pub fn compute_grant(owned_before: i64, tier: &TierValues) -> Grant {
    let is_new = owned_before <= 0;
    Grant {
        is_new,
        points_delta: tier.points,
        coins_delta: if is_new { tier.coins } else { 0 },
        owned_count: owned_before.max(0) + 1,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawRules {
    pub cards_dir: PathBuf,
    pub tiers: TierTable,
    pub fallback: FallbackPolicy,
    pub cooldown: Duration,
}

impl Default for DrawRules {
    fn default() -> Self {
        Self {
            cards_dir: PathBuf::from("cards"),
            tiers: TierTable::default(),
            fallback: FallbackPolicy::AnyCard,
            cooldown: Duration::from_secs(1440),
        }
    }
}

/// A card handed out by a draw or a chest, with the committed account.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawResult {
    pub entry: CatalogEntry,
    pub grant: Grant,
    pub account: UserAccount,
}

/// One async mutex per user id; held for the whole read-modify-write cycle.
/// An entry lives only while someone holds or waits for it.
#[derive(Default)]
struct UserLocks {
    map: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: &str) -> UserGuard<'_> {
        let lock = {
            let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(user_id.to_string()).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;
        UserGuard {
            locks: self,
            user_id: user_id.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

struct UserGuard<'a> {
    locks: &'a UserLocks,
    user_id: String,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.locks.map.lock().unwrap_or_else(|e| e.into_inner());
        // one reference in the map, one here: nobody else is waiting
        if Arc::strong_count(&self.lock) == 2 {
            map.remove(&self.user_id);
        }
    }
}

/// Balances, card ownership and cooldowns on top of an injected store.
/// Every mutating operation is serialized per user.
#[derive(Clone)]
pub struct Ledger {
    store: SqliteStore,
    locks: Arc<UserLocks>,
}

impl Ledger {
    pub fn new(store: SqliteStore) -> Self {
        Self {
            store,
            locks: Arc::new(UserLocks::default()),
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    fn load_or_create(&self, player: &Player) -> Result<UserAccount, StoreError> {
        let mut account = self
            .store
            .load_user(&player.id)?
            .unwrap_or_else(|| UserAccount::new(player.id.clone(), player.display_name.clone()));
        account.display_name = player.display_name.clone();
        Ok(account)
    }

    // Caller holds the user's lock.
    fn grant(
        &self,
        account: &mut UserAccount,
        card: &CardDefinition,
        tiers: &TierTable,
    ) -> Result<Grant, StoreError> {
        let owned = self.store.owned_count(&account.user_id, &card.name)?;
        let mut grant = compute_grant(owned, tiers.get(card.rarity));
        account.score = apply_delta(account.score, grant.points_delta);
        account.coins = apply_delta(account.coins, grant.coins_delta);
        grant.owned_count = self.store.commit_grant(account, card)?;
        Ok(grant)
    }

    /// Cooldown-gated draw of one card from the catalog directory.
    pub async fn draw<R: Rng + Send>(
        &self,
        player: &Player,
        now: i64,
        rules: &DrawRules,
        rng: &mut R,
    ) -> GameResult<DrawResult> {
        let _guard = self.locks.acquire(&player.id).await;
        let mut account = self.load_or_create(player)?;
        check_cooldown(now, account.last_draw_time, rules.cooldown)
            .map_err(GameError::CooldownActive)?;

        let catalog = scan_catalog(&rules.cards_dir)?;
        let entry = pick_card(&catalog, &rules.tiers, rules.fallback, rng)?.clone();

        account.last_draw_time = Some(now);
        let grant = self.grant(&mut account, &entry.card, &rules.tiers)?;
        tracing::info!(
            "draw: user={} card={:?} rarity={} new={} owned={} score={}",
            account.user_id,
            entry.card.name,
            entry.card.rarity.as_str(),
            grant.is_new,
            grant.owned_count,
            account.score
        );
        Ok(DrawResult {
            entry,
            grant,
            account,
        })
    }

    /// Buy a chest with coins and receive one card drawn with the chest's
    /// odds. Not subject to the draw cooldown.
    pub async fn open_chest<R: Rng + Send>(
        &self,
        player: &Player,
        kind: ChestKind,
        chests: &ChestRules,
        rules: &DrawRules,
        rng: &mut R,
    ) -> GameResult<DrawResult> {
        let spec = chests.spec(kind);
        let _guard = self.locks.acquire(&player.id).await;
        let mut account = self.load_or_create(player)?;
        check_affordable(account.coins, spec)?;

        let tiers = rules.tiers.with_weights(spec.weights);
        let catalog = scan_catalog(&rules.cards_dir)?;
        let entry = pick_card(&catalog, &tiers, rules.fallback, rng)?.clone();

        account.coins = apply_delta(account.coins, -spec.price);
        let grant = self.grant(&mut account, &entry.card, &tiers)?;
        tracing::info!(
            "chest: user={} kind={} card={:?} rarity={} coins_left={}",
            account.user_id,
            kind.as_str(),
            entry.card.name,
            entry.card.rarity.as_str(),
            account.coins
        );
        Ok(DrawResult {
            entry,
            grant,
            account,
        })
    }

    /// Place a dice bet. The die is rolled and the resulting balance is
    /// stored in one write; only the announcement is delayed.
    pub async fn place_bet<R: Rng + Send>(
        &self,
        player: &Player,
        stake: Option<i64>,
        now: i64,
        rules: &WagerRules,
        rng: &mut R,
    ) -> GameResult<PendingWager> {
        let _guard = self.locks.acquire(&player.id).await;
        let mut account = self.load_or_create(player)?;
        check_cooldown(now, account.last_wager_time, rules.cooldown)
            .map_err(GameError::CooldownActive)?;

        let roll = roll_die(rng);
        let outcome = resolve_bet(account.score, stake, roll, &rules.dice)?;
        self.commit_wager(&mut account, &outcome, now)?;
        tracing::info!(
            "bet: user={} stake={} roll={} win={} score={}",
            account.user_id,
            outcome.stake,
            roll,
            outcome.win,
            account.score
        );
        Ok(PendingWager {
            user_id: account.user_id,
            kind: WagerKind::Dice { roll },
            outcome,
            score: account.score,
        })
    }

    /// Play a fixed-cost emoji game.
    pub async fn place_arcade<R: Rng + Send>(
        &self,
        player: &Player,
        game: ArcadeGame,
        now: i64,
        rules: &WagerRules,
        rng: &mut R,
    ) -> GameResult<PendingWager> {
        let _guard = self.locks.acquire(&player.id).await;
        let mut account = self.load_or_create(player)?;
        check_cooldown(now, account.last_wager_time, rules.cooldown)
            .map_err(GameError::CooldownActive)?;

        let won = rng.gen_bool(rules.arcade.win_chance.clamp(0.0, 1.0));
        let outcome = resolve_arcade(account.score, won, &rules.arcade)?;
        self.commit_wager(&mut account, &outcome, now)?;
        tracing::info!(
            "arcade: user={} game={:?} win={} score={}",
            account.user_id,
            game,
            won,
            account.score
        );
        Ok(PendingWager {
            user_id: account.user_id,
            kind: WagerKind::Arcade(game),
            outcome,
            score: account.score,
        })
    }

    // Balance and cooldown go to the store together with the outcome.
    fn commit_wager(
        &self,
        account: &mut UserAccount,
        outcome: &WagerOutcome,
        now: i64,
    ) -> Result<(), StoreError> {
        account.score = apply_delta(account.score, outcome.delta);
        account.last_wager_time = Some(now);
        self.store.save_user(account)
    }

    pub fn account(&self, user_id: &str) -> GameResult<Option<UserAccount>> {
        Ok(self.store.load_user(user_id)?)
    }

    pub fn collection(&self, user_id: &str) -> GameResult<Vec<OwnedCard>> {
        Ok(self.store.collection(user_id)?)
    }

    pub fn leaderboard(&self, limit: usize) -> GameResult<Vec<UserAccount>> {
        Ok(self.store.top_by_score(limit)?)
    }
}
