use crate::error::GameError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChestKind {
    Small,
    Big,
}

impl ChestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChestKind::Small => "small",
            ChestKind::Big => "big",
        }
    }
}

/// An empty word picks the small chest.
pub fn parse_chest_kind(s: &str) -> Option<ChestKind> {
    match s {
        "" | "small" | "малый" | "маленький" => Some(ChestKind::Small),
        "big" | "large" | "большой" => Some(ChestKind::Big),
        _ => None,
    }
}

/// Price in coins and the tier weights used when opening.
#[derive(Clone, Debug, PartialEq)]
pub struct ChestSpec {
    pub price: i64,
    pub weights: [f64; 5],
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChestRules {
    pub small: ChestSpec,
    pub big: ChestSpec,
}

impl ChestRules {
    pub fn spec(&self, kind: ChestKind) -> &ChestSpec {
        match kind {
            ChestKind::Small => &self.small,
            ChestKind::Big => &self.big,
        }
    }
}

impl Default for ChestRules {
    fn default() -> Self {
        Self {
            small: ChestSpec {
                price: 10,
                weights: [20.0, 35.0, 30.0, 12.0, 3.0],
            },
            big: ChestSpec {
                price: 30,
                weights: [0.0, 20.0, 45.0, 28.0, 7.0],
            },
        }
    }
}

pub fn check_affordable(coins: i64, spec: &ChestSpec) -> Result<(), GameError> {
    if coins < spec.price {
        return Err(GameError::InsufficientBalance {
            needed: spec.price,
            available: coins,
        });
    }
    Ok(())
}
