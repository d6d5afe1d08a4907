//! Card collecting game for Telegram chats: users type a trigger word to
//! receive a rarity-weighted card, collect points and coins, open chests and
//! bet points on dice.

pub mod bot;
pub mod catalog;
pub mod chest;
pub mod command;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod ledger;
pub mod messages;
pub mod rarity;
pub mod sampler;
pub mod storage;
pub mod wager;

pub use bot::{now_unix, run_bot};
pub use catalog::{CardDefinition, CatalogEntry, parse_card_filename, scan_catalog};
pub use chest::{ChestKind, ChestRules, ChestSpec};
pub use command::{Command, Query, Triggers, classify};
pub use config::{Config, SharedConfig};
pub use cooldown::{Remaining, can_draw, check_cooldown};
pub use error::{GameError, GameResult, StoreError};
pub use ledger::{DrawResult, DrawRules, Grant, Ledger, OwnedCard, Player, UserAccount};
pub use messages::{Lang, Messages, default_messages, format_with, load_all_messages, parse_lang};
pub use rarity::{Rarity, TierTable, TierValues};
pub use sampler::{FallbackPolicy, pick_card, sample_rarity};
pub use storage::SqliteStore;
pub use wager::{
    ArcadeGame, ArcadeRules, DiceRules, PendingWager, WagerKind, WagerOutcome, WagerRules,
    resolve_bet,
};
