use std::time::Duration;

use rand::Rng;

use crate::error::GameError;

/// Balances are clamped here and never go below it.
pub const BALANCE_FLOOR: i64 = 0;

/// Fixed-cost emoji games.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArcadeGame {
    Casino,
    Football,
    Basketball,
}

impl ArcadeGame {
    pub fn emoji(&self) -> &'static str {
        match self {
            ArcadeGame::Casino => "🎰",
            ArcadeGame::Football => "⚽",
            ArcadeGame::Basketball => "🏀",
        }
    }
}

pub fn parse_arcade_game(s: &str) -> Option<ArcadeGame> {
    match s {
        "казино" | "/casino" => Some(ArcadeGame::Casino),
        "футбол" | "/football" => Some(ArcadeGame::Football),
        "баскетбол" | "/basketball" => Some(ArcadeGame::Basketball),
        _ => None,
    }
}

/// Dice bet: a roll strictly above `win_threshold` wins and returns
/// `floor(stake * payout_multiplier)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiceRules {
    pub win_threshold: u8,
    pub payout_multiplier: f64,
}

impl Default for DiceRules {
    fn default() -> Self {
        Self {
            win_threshold: 3,
            payout_multiplier: 1.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcadeRules {
    pub cost: i64,
    pub reward: i64,
    pub win_chance: f64,
}

impl Default for ArcadeRules {
    fn default() -> Self {
        Self {
            cost: 5,
            reward: 20,
            win_chance: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WagerRules {
    pub cooldown: Duration,
    /// Pause between placing a bet and revealing its result.
    pub reveal_delay: Duration,
    pub dice: DiceRules,
    pub arcade: ArcadeRules,
}

impl Default for WagerRules {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(30),
            reveal_delay: Duration::from_secs(3),
            dice: DiceRules::default(),
            arcade: ArcadeRules::default(),
        }
    }
}

/// Result of a bet. `stake` is the validated amount put at risk and `delta`
/// the net change to the balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WagerOutcome {
    pub win: bool,
    pub stake: i64,
    pub delta: i64,
}

impl WagerOutcome {
    /// What the player gets back on a win: the stake plus the winnings.
    pub fn payout(&self) -> i64 {
        if self.win { self.stake + self.delta } else { 0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WagerKind {
    Dice { roll: u8 },
    Arcade(ArcadeGame),
}

/// A fully committed bet waiting to be announced. `score` is the balance
/// already stored for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingWager {
    pub user_id: String,
    pub kind: WagerKind,
    pub outcome: WagerOutcome,
    pub score: i64,
}

pub fn roll_die<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(1..=6)
}

pub fn dice_payout(stake: i64, rules: &DiceRules) -> i64 {
    (stake as f64 * rules.payout_multiplier).floor() as i64
}

pub fn apply_delta(balance: i64, delta: i64) -> i64 {
    balance.saturating_add(delta).max(BALANCE_FLOOR)
}

/// Check that the stake is positive and affordable.
pub fn validate_stake(stake: Option<i64>, balance: i64) -> Result<i64, GameError> {
    let stake = match stake {
        Some(s) if s > 0 => s,
        _ => return Err(GameError::InvalidWagerAmount),
    };
    if stake > balance {
        return Err(GameError::InsufficientBalance {
            needed: stake,
            available: balance,
        });
    }
    Ok(stake)
}

pub fn resolve_bet(
    balance: i64,
    stake: Option<i64>,
    outcome: u8,
    rules: &DiceRules,
) -> Result<WagerOutcome, GameError> {
    let stake = validate_stake(stake, balance)?;
    let win = outcome > rules.win_threshold;
    let delta = if win {
        dice_payout(stake, rules) - stake
    } else {
        -stake
    };
    Ok(WagerOutcome { win, stake, delta })
}

pub fn resolve_arcade(
    balance: i64,
    won: bool,
    rules: &ArcadeRules,
) -> Result<WagerOutcome, GameError> {
    let cost = validate_stake(Some(rules.cost), balance)?;
    let delta = if won { rules.reward - cost } else { -cost };
    Ok(WagerOutcome {
        win: won,
        stake: cost,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winning_roll_pays_multiplier() {
        let out = resolve_bet(100, Some(10), 6, &DiceRules::default()).unwrap();
        assert!(out.win);
        assert_eq!(apply_delta(100, out.delta), 100 - 10 + 15);
    }

    #[test]
    fn losing_roll_costs_stake() {
        let out = resolve_bet(100, Some(10), 1, &DiceRules::default()).unwrap();
        assert!(!out.win);
        assert_eq!(apply_delta(100, out.delta), 90);
    }

    #[test]
    fn threshold_roll_loses() {
        let out = resolve_bet(100, Some(10), 3, &DiceRules::default()).unwrap();
        assert!(!out.win);
    }

    #[test]
    fn bad_stakes_are_rejected() {
        let rules = DiceRules::default();
        assert!(matches!(
            resolve_bet(100, None, 6, &rules),
            Err(GameError::InvalidWagerAmount)
        ));
        assert!(matches!(
            resolve_bet(100, Some(0), 6, &rules),
            Err(GameError::InvalidWagerAmount)
        ));
        assert!(matches!(
            resolve_bet(100, Some(-5), 6, &rules),
            Err(GameError::InvalidWagerAmount)
        ));
        assert!(matches!(
            resolve_bet(5, Some(6), 6, &rules),
            Err(GameError::InsufficientBalance {
                needed: 6,
                available: 5
            })
        ));
    }

    #[test]
    fn balance_never_goes_below_floor() {
        assert_eq!(apply_delta(3, -10), BALANCE_FLOOR);
    }

    #[test]
    fn arcade_pays_fixed_reward() {
        let rules = ArcadeRules::default();
        let win = resolve_arcade(5, true, &rules).unwrap();
        assert_eq!(apply_delta(5, win.delta), 20);
        let loss = resolve_arcade(5, false, &rules).unwrap();
        assert_eq!(apply_delta(5, loss.delta), 0);
        assert!(resolve_arcade(4, true, &rules).is_err());
    }

    #[test]
    fn payout_returns_stake_and_winnings() {
        let win = resolve_bet(100, Some(10), 5, &DiceRules::default()).unwrap();
        assert_eq!(win.stake, 10);
        assert_eq!(win.payout(), 15);
        let loss = resolve_bet(100, Some(10), 2, &DiceRules::default()).unwrap();
        assert_eq!(loss.stake, 10);
        assert_eq!(loss.payout(), 0);
    }

    #[test]
    fn die_stays_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..1_000 {
            let v = roll_die(&mut rng);
            assert!((1..=6).contains(&v));
        }
    }
}
