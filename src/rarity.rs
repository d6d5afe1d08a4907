/// Rarity tiers, ordered from most to least common.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rarity {
    Common,
    Rare,
    Mythic,
    Legendary,
    Limited,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Rare,
        Rarity::Mythic,
        Rarity::Legendary,
        Rarity::Limited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Mythic => "mythic",
            Rarity::Legendary => "legendary",
            Rarity::Limited => "limited",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Rarity::Common => "⭐️",
            Rarity::Rare => "💎",
            Rarity::Mythic => "🔥",
            Rarity::Legendary => "👑",
            Rarity::Limited => "🌀",
        }
    }

    /// Position in [`Rarity::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Parse a tier word, English or Russian, ignoring case.
pub fn parse_rarity(s: &str) -> Option<Rarity> {
    match s.trim().to_lowercase().as_str() {
        "common" | "обычная" => Some(Rarity::Common),
        "rare" | "редкая" => Some(Rarity::Rare),
        "mythic" | "мифическая" => Some(Rarity::Mythic),
        "legendary" | "легендарная" => Some(Rarity::Legendary),
        "limited" | "лимитированная" => Some(Rarity::Limited),
        _ => None,
    }
}

/// Per-tier tuning: relative draw weight and the reward for receiving a card.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierValues {
    pub weight: f64,
    pub points: i64,
    pub coins: i64,
}

/// Weights and rewards for every tier. Weights are relative and need not sum
/// to 100.
#[derive(Clone, Debug, PartialEq)]
pub struct TierTable {
    tiers: [TierValues; 5],
}

pub const DEFAULT_WEIGHTS: [f64; 5] = [55.0, 25.0, 17.0, 2.95, 0.05];
pub const DEFAULT_POINTS: [i64; 5] = [5, 10, 25, 50, 100];
pub const DEFAULT_COINS: [i64; 5] = [1, 2, 5, 10, 20];

impl TierTable {
    pub fn new(weights: [f64; 5], points: [i64; 5], coins: [i64; 5]) -> Self {
        let tiers = std::array::from_fn(|i| TierValues {
            weight: weights[i],
            points: points[i],
            coins: coins[i],
        });
        Self { tiers }
    }

    pub fn get(&self, rarity: Rarity) -> &TierValues {
        &self.tiers[rarity.index()]
    }

    pub fn weights(&self) -> [f64; 5] {
        self.tiers.map(|t| t.weight)
    }

    /// Same rewards, different draw odds (used by chests).
    pub fn with_weights(&self, weights: [f64; 5]) -> Self {
        let mut table = self.clone();
        for (tier, weight) in table.tiers.iter_mut().zip(weights) {
            tier.weight = weight;
        }
        table
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::new(DEFAULT_WEIGHTS, DEFAULT_POINTS, DEFAULT_COINS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_languages_case_insensitively() {
        assert_eq!(parse_rarity("Legendary"), Some(Rarity::Legendary));
        assert_eq!(parse_rarity("ЛЕГЕНДАРНАЯ"), Some(Rarity::Legendary));
        assert_eq!(parse_rarity("редкая"), Some(Rarity::Rare));
        assert_eq!(parse_rarity("shiny"), None);
    }

    #[test]
    fn with_weights_keeps_rewards() {
        let base = TierTable::default();
        let chest = base.with_weights([0.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(chest.get(Rarity::Common).weight, 0.0);
        assert_eq!(chest.get(Rarity::Limited).points, 100);
        assert_eq!(chest.get(Rarity::Mythic).coins, 5);
    }
}
