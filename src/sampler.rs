use rand::{
    Rng,
    distributions::{Distribution, WeightedIndex},
    seq::SliceRandom,
};

use crate::{
    catalog::CatalogEntry,
    error::GameError,
    rarity::{Rarity, TierTable},
};

/// What to do when the sampled tier has no card in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Pick uniformly from the whole catalog.
    #[default]
    AnyCard,
    /// Refuse the draw.
    Strict,
}

/// Draw one tier using the table weights as relative probabilities.
/// `None` when no weight is positive.
pub fn sample_rarity<R: Rng + ?Sized>(table: &TierTable, rng: &mut R) -> Option<Rarity> {
    let dist = WeightedIndex::new(table.weights()).ok()?;
    Some(Rarity::ALL[dist.sample(rng)])
}

/// Pick a card: weighted tier first, then uniform among the cards of that tier.
pub fn pick_card<'a, R: Rng + ?Sized>(
    catalog: &'a [CatalogEntry],
    table: &TierTable,
    policy: FallbackPolicy,
    rng: &mut R,
) -> Result<&'a CatalogEntry, GameError> {
    if catalog.is_empty() {
        return Err(GameError::CatalogEmpty);
    }
    if let Some(tier) = sample_rarity(table, rng) {
        let candidates: Vec<&CatalogEntry> =
            catalog.iter().filter(|e| e.card.rarity == tier).collect();
        if let Some(&entry) = candidates.choose(rng) {
            return Ok(entry);
        }
        tracing::debug!("no {} cards in catalog, policy {:?}", tier.as_str(), policy);
    }
    match policy {
        FallbackPolicy::AnyCard => catalog.choose(rng).ok_or(GameError::CatalogEmpty),
        FallbackPolicy::Strict => Err(GameError::CatalogEmpty),
    }
}
