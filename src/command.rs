use crate::{
    chest::{ChestKind, parse_chest_kind},
    wager::{ArcadeGame, parse_arcade_game},
};

/// Read-only requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Query {
    Collection,
    Leaderboard,
    Balance,
    Help,
}

/// A classified chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Draw,
    /// Dice bet; `None` when the amount is missing or not a whole number.
    Wager(Option<i64>),
    Arcade(ArcadeGame),
    OpenChest(ChestKind),
    Query(Query),
}

/// Configured draw trigger phrases, stored lowercased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Triggers {
    draw: Vec<String>,
}

impl Triggers {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let draw = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { draw }
    }

    pub fn phrases(&self) -> &[String] {
        &self.draw
    }

    pub fn is_empty(&self) -> bool {
        self.draw.is_empty()
    }

    pub fn is_draw(&self, text: &str) -> bool {
        self.draw.iter().any(|t| t == text)
    }
}

impl Default for Triggers {
    fn default() -> Self {
        Self::new(["фаня", "фаняк"])
    }
}

/// `/top@my_bot` -> `/top`
fn strip_bot_mention(word: &str) -> &str {
    if word.starts_with('/') {
        word.split('@').next().unwrap_or(word)
    } else {
        word
    }
}

/// Classify a message in one step. Matching is case-insensitive and ignores
/// surrounding whitespace. Returns `None` for ordinary chat.
pub fn classify(text: &str, triggers: &Triggers) -> Option<Command> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    if triggers.is_draw(&text) {
        return Some(Command::Draw);
    }

    let mut parts = text.split_whitespace();
    let head = strip_bot_mention(parts.next()?);
    let rest: Vec<&str> = parts.collect();

    match head {
        "/dice" | "ставка" => {
            let amount = match rest.as_slice() {
                [amount] => amount.parse::<i64>().ok(),
                _ => None,
            };
            Some(Command::Wager(amount))
        }
        "/chest" | "сундук" => {
            let kind = match rest.as_slice() {
                [] => parse_chest_kind(""),
                [kind] => parse_chest_kind(kind),
                _ => None,
            };
            Some(kind.map_or(Command::Query(Query::Help), Command::OpenChest))
        }
        "/mycards" | "/cards" | "карточки" => Some(Command::Query(Query::Collection)),
        "/top" | "топ" => Some(Command::Query(Query::Leaderboard)),
        "/balance" | "баланс" => Some(Command::Query(Query::Balance)),
        "/start" | "/help" => Some(Command::Query(Query::Help)),
        word if rest.is_empty() => parse_arcade_game(word).map(Command::Arcade),
        _ => None,
    }
}
