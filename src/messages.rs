use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

use crate::rarity::Rarity;

/// Supported reply languages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lang {
    En,
    Ru,
}

/// Parse a short language tag into `Lang`.
pub fn parse_lang(s: &str) -> Option<Lang> {
    match s.to_lowercase().as_str() {
        "en" => Some(Lang::En),
        "ru" => Some(Lang::Ru),
        _ => None,
    }
}

/// Return the short tag for a Lang variant (e.g. Lang::En -> "en").
pub fn lang_tag(l: &Lang) -> &'static str {
    match l {
        Lang::En => "en",
        Lang::Ru => "ru",
    }
}

/// Pick a language from the Telegram `language_code` (`ru`, `en-US`, ...),
/// falling back to `default`.
pub fn effective_lang(user_language_code: Option<&str>, default: Lang) -> Lang {
    if let Some(code) = user_language_code {
        if let Some(parsed) = parse_lang(code) {
            return parsed;
        }
        if let Some(prefix) = code.get(..2) {
            if let Some(parsed) = parse_lang(prefix) {
                return parsed;
            }
        }
    }
    default
}

/// Reply templates loaded from JSON files per language
#[derive(Clone, Debug, Deserialize)]
pub struct Messages {
    pub language_name: String,
    pub help: String,
    pub cannot_play: String,
    pub draw_cooldown: String,
    pub wager_cooldown: String,
    pub catalog_empty: String,
    pub card_caption: String,
    pub new_card: String,
    pub duplicate_card: String,
    pub chest_opened: String,
    pub insufficient_balance: String,
    pub invalid_wager: String,
    pub bet_placed: String,
    pub wager_win: String,
    pub wager_loss: String,
    pub arcade_win: String,
    pub arcade_loss: String,
    pub collection_header: String,
    pub collection_empty: String,
    pub collection_line: String,
    pub leaderboard_header: String,
    pub leaderboard_empty: String,
    pub leaderboard_line: String,
    pub balance: String,
    pub try_again_later: String,
    /// Tier names in `Rarity::ALL` order.
    #[serde(default)]
    pub rarity_names: Vec<String>,
}

impl Messages {
    pub fn rarity_name(&self, rarity: Rarity) -> &str {
        self.rarity_names
            .get(rarity.index())
            .map(String::as_str)
            .unwrap_or_else(|| rarity.as_str())
    }
}

/// Load a Messages struct from a given JSON file path, falling back to defaults
pub fn load_messages_file(path: &Path) -> Messages {
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!("failed to parse {}: {}. Falling back to defaults.", path.display(), e);
            default_messages()
        }),
        Err(e) => {
            tracing::warn!("failed to read {}: {}. Falling back to defaults.", path.display(), e);
            default_messages()
        }
    }
}

/// Built-in English texts, used when no message file can be read.
pub fn default_messages() -> Messages {
    Messages {
        language_name: "English".to_string(),
        help: "Type one of {triggers} to look for a card (every {cooldown}).\n/dice <amount> - bet points on a die roll\n/casino, /football, /basketball - {game_cost} points per game\n/chest [small|big] - open a chest for coins\n/mycards - your collection\n/top - leaderboard\n/balance - your points and coins".to_string(),
        cannot_play: "I can't play with messages that have no sender.".to_string(),
        draw_cooldown: "😔 You looked around but no card is nearby.\n\n🕐 Come back in {hours}h {minutes}m {seconds}s.".to_string(),
        wager_cooldown: "⏳ Next bet in {hours}h {minutes}m {seconds}s.".to_string(),
        catalog_empty: "❌ No cards available.".to_string(),
        card_caption: "📸 {name}\n{emoji} Rarity: {rarity}\n{status}\n🎁 +{points} points, +{coins} coins | 🧮 Total: {score}".to_string(),
        new_card: "🎉 New card!".to_string(),
        duplicate_card: "🔁 Duplicate card! You have {count} now.".to_string(),
        chest_opened: "🧰 Chest opened! -{price} coins, {coins_left} left.".to_string(),
        insufficient_balance: "😢 Not enough: you need {needed}, you have {available}.".to_string(),
        invalid_wager: "Usage: /dice <amount>, where amount is a positive whole number.".to_string(),
        bet_placed: "{emoji} Bet of {stake} accepted...".to_string(),
        wager_win: "🎉 Rolled {roll}! You win {payout}. Score: {score}.".to_string(),
        wager_loss: "😞 Rolled {roll}. You lose {stake}. Score: {score}.".to_string(),
        arcade_win: "🎉 Victory! +{reward} points. Score: {score}.".to_string(),
        arcade_loss: "😞 Defeat! Score: {score}.".to_string(),
        collection_header: "🎴 Your cards (points: {score}, coins: {coins}):".to_string(),
        collection_empty: "You have no cards yet 😔".to_string(),
        collection_line: "{index}. {name} - {rarity} x{count}".to_string(),
        leaderboard_header: "🏆 Top players:".to_string(),
        leaderboard_empty: "Nobody has scored yet.".to_string(),
        leaderboard_line: "{place}. {name} - {score}".to_string(),
        balance: "🧮 Points: {score} | 🪙 Coins: {coins}".to_string(),
        try_again_later: "⚠️ Something went wrong, please try again later.".to_string(),
        rarity_names: vec![
            "Common".to_string(),
            "Rare".to_string(),
            "Mythic".to_string(),
            "Legendary".to_string(),
            "Limited".to_string(),
        ],
    }
}

/// Load every `*.json` file from `dir` and return a map from language tag to
/// parsed `Messages`. Unknown language files are skipped.
pub fn load_all_messages(dir: &Path) -> HashMap<String, Messages> {
    let mut map = HashMap::new();
    if let Ok(entries) = dir.read_dir() {
        for entry in entries.flatten() {
            if let Ok(fname) = entry.file_name().into_string() {
                if fname.to_lowercase().ends_with(".json") {
                    let stem = &fname[..fname.len() - ".json".len()];
                    if let Some(lang) = parse_lang(stem) {
                        let msgs = load_messages_file(&entry.path());
                        map.insert(lang_tag(&lang).to_string(), msgs);
                    } else {
                        tracing::warn!("skipping unknown language file: {}", fname);
                    }
                }
            }
        }
    }
    map
}

/// Simple template formatter: replace `{key}` with `value` for each pair in `pairs`.
pub fn format_with(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut s = template.to_string();
    for (k, v) in pairs {
        s = s.replace(&format!("{{{}}}", k), v);
    }
    s
}
