use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use anyhow::{Result, bail};

use crate::{
    chest::{ChestRules, ChestSpec},
    command::Triggers,
    ledger::DrawRules,
    messages::{Lang, Messages, default_messages, lang_tag, load_all_messages, parse_lang},
    rarity::{DEFAULT_COINS, DEFAULT_POINTS, DEFAULT_WEIGHTS, TierTable},
    sampler::FallbackPolicy,
    wager::{ArcadeRules, DiceRules, WagerRules},
};

/// Runtime configuration (from environment with sensible defaults)
#[derive(Clone, Debug)]
pub struct Config {
    pub lang: Lang,
    pub messages: HashMap<String, Messages>,
    pub database_path: PathBuf,
    pub triggers: Triggers,
    pub draw: DrawRules,
    pub wager: WagerRules,
    pub chests: ChestRules,
    pub leaderboard_size: usize,
    fallback_messages: Messages,
}

pub type SharedConfig = Arc<Config>;

/// Parse a comma separated list of exactly five values, one per tier.
pub fn parse_tier_list<T: FromStr>(s: &str) -> Option<[T; 5]> {
    let values: Vec<T> = s
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    values.try_into().ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn check_weights(name: &str, weights: &[f64; 5]) -> Result<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        bail!("Invalid configuration: {name} must be non-negative numbers ({weights:?}).");
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        bail!("Invalid configuration: {name} must have at least one positive weight.");
    }
    Ok(())
}

impl Config {
    /// Read the process environment (after `.env` was loaded).
    pub fn from_env() -> Result<Self> {
        let dir = env::var("MESSAGES_DIR").unwrap_or_else(|_| "messages".to_string());
        Self::from_lookup(|key| env::var(key).ok(), Path::new(&dir))
    }

    /// Build and validate a config from any key lookup.
    pub fn from_lookup<F>(get: F, messages_dir: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let num = |key: &str| get(key).map(|v| v.trim().to_string());
        let secs = |key: &str, default: u64| {
            Duration::from_secs(num(key).and_then(|v| v.parse().ok()).unwrap_or(default))
        };

        let lang = num("DEFAULT_LANG")
            .and_then(|v| parse_lang(&v))
            .unwrap_or(Lang::Ru);

        let weights = match num("RARITY_WEIGHTS") {
            Some(v) => match parse_tier_list::<f64>(&v) {
                Some(w) => w,
                None => bail!("Invalid configuration: RARITY_WEIGHTS ({v}) needs five numbers."),
            },
            None => DEFAULT_WEIGHTS,
        };
        let points = match num("RARITY_POINTS") {
            Some(v) => match parse_tier_list::<i64>(&v) {
                Some(p) => p,
                None => bail!("Invalid configuration: RARITY_POINTS ({v}) needs five integers."),
            },
            None => DEFAULT_POINTS,
        };
        let coins = match num("RARITY_COINS") {
            Some(v) => match parse_tier_list::<i64>(&v) {
                Some(c) => c,
                None => bail!("Invalid configuration: RARITY_COINS ({v}) needs five integers."),
            },
            None => DEFAULT_COINS,
        };

        let strict = num("STRICT_RARITY")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(false);

        let draw = DrawRules {
            cards_dir: num("CARDS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("cards")),
            tiers: TierTable::new(weights, points, coins),
            fallback: if strict {
                FallbackPolicy::Strict
            } else {
                FallbackPolicy::AnyCard
            },
            cooldown: secs("DRAW_COOLDOWN_SECS", 1440),
        };

        let wager = WagerRules {
            cooldown: secs("WAGER_COOLDOWN_SECS", 30),
            reveal_delay: secs("WAGER_REVEAL_DELAY_SECS", 3),
            dice: DiceRules {
                win_threshold: num("DICE_WIN_THRESHOLD")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3),
                payout_multiplier: num("DICE_PAYOUT_MULTIPLIER")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1.5),
            },
            arcade: ArcadeRules {
                cost: num("GAME_COST").and_then(|v| v.parse().ok()).unwrap_or(5),
                reward: num("GAME_WIN_REWARD")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
                win_chance: num("GAME_WIN_CHANCE")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.5),
            },
        };

        let defaults = ChestRules::default();
        let chest = |prefix: &str, fallback: &ChestSpec| -> Result<ChestSpec> {
            let price = num(&format!("{prefix}_PRICE"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(fallback.price);
            let weights = match num(&format!("{prefix}_WEIGHTS")) {
                Some(v) => match parse_tier_list::<f64>(&v) {
                    Some(w) => w,
                    None => bail!("Invalid configuration: {prefix}_WEIGHTS ({v}) needs five numbers."),
                },
                None => fallback.weights,
            };
            Ok(ChestSpec { price, weights })
        };
        let chests = ChestRules {
            small: chest("CHEST_SMALL", &defaults.small)?,
            big: chest("CHEST_BIG", &defaults.big)?,
        };

        let triggers = match num("DRAW_TRIGGERS") {
            Some(v) => Triggers::new(v.split(',')),
            None => Triggers::default(),
        };

        let mut messages = load_all_messages(messages_dir);
        if !messages.contains_key("en") {
            messages.insert("en".to_string(), default_messages());
        }

        let cfg = Config {
            lang,
            messages,
            database_path: num("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/cards.sqlite")),
            triggers,
            draw,
            wager,
            chests,
            leaderboard_size: num("LEADERBOARD_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            fallback_messages: default_messages(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let tiers = &self.draw.tiers;
        check_weights("RARITY_WEIGHTS", &tiers.weights())?;
        for rarity in crate::rarity::Rarity::ALL {
            let t = tiers.get(rarity);
            if t.points < 0 || t.coins < 0 {
                bail!(
                    "Invalid configuration: rewards for {} must be non-negative.",
                    rarity.as_str()
                );
            }
        }
        if self.triggers.is_empty() {
            bail!("Invalid configuration: DRAW_TRIGGERS must name at least one phrase.");
        }
        let dice = &self.wager.dice;
        if dice.win_threshold >= 6 {
            bail!(
                "Invalid configuration: DICE_WIN_THRESHOLD ({}) must be below 6.",
                dice.win_threshold
            );
        }
        if !dice.payout_multiplier.is_finite() || dice.payout_multiplier < 0.0 {
            bail!(
                "Invalid configuration: DICE_PAYOUT_MULTIPLIER ({}) must be a non-negative number.",
                dice.payout_multiplier
            );
        }
        let arcade = &self.wager.arcade;
        if arcade.cost <= 0 || arcade.reward < 0 {
            bail!(
                "Invalid configuration: GAME_COST ({}) must be positive and GAME_WIN_REWARD ({}) non-negative.",
                arcade.cost,
                arcade.reward
            );
        }
        if !(0.0..=1.0).contains(&arcade.win_chance) {
            bail!(
                "Invalid configuration: GAME_WIN_CHANCE ({}) must be between 0 and 1.",
                arcade.win_chance
            );
        }
        for (name, spec) in [("CHEST_SMALL", &self.chests.small), ("CHEST_BIG", &self.chests.big)] {
            if spec.price <= 0 {
                bail!("Invalid configuration: {name}_PRICE ({}) must be positive.", spec.price);
            }
            check_weights(&format!("{name}_WEIGHTS"), &spec.weights)?;
        }
        if self.leaderboard_size == 0 {
            bail!("Invalid configuration: LEADERBOARD_SIZE must be positive.");
        }
        Ok(())
    }

    /// Texts for `lang`, then the configured default language, then English.
    pub fn messages_for(&self, lang: Lang) -> &Messages {
        self.messages
            .get(lang_tag(&lang))
            .or_else(|| self.messages.get(lang_tag(&self.lang)))
            .or_else(|| self.messages.get("en"))
            .unwrap_or(&self.fallback_messages)
    }
}
