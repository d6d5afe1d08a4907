use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::rarity::{Rarity, parse_rarity};

/// Name given to files that do not follow `<slug>_<rarity>.<ext>`.
pub const UNKNOWN_CARD_NAME: &str = "Unknown card";

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A card as described by its image file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CardDefinition {
    pub name: String,
    pub rarity: Rarity,
}

impl CardDefinition {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_CARD_NAME.to_string(),
            rarity: Rarity::Common,
        }
    }
}

/// A card image on disk together with its parsed definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub card: CardDefinition,
}

/// Turn `<slug>_<rarity>.<ext>` into a card definition. A name without `_`
/// (or with an empty slug) becomes the unknown card. Returns `None` when the
/// tier word is not a known rarity; such files are not part of the catalog.
pub fn parse_card_filename(filename: &str) -> Option<CardDefinition> {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let Some((slug, tier)) = stem.rsplit_once('_') else {
        return Some(CardDefinition::unknown());
    };
    let rarity = parse_rarity(tier)?;
    let name = slug_to_name(slug);
    if name.trim().is_empty() {
        return Some(CardDefinition::unknown());
    }
    Some(CardDefinition { name, rarity })
}

/// `golden-fanya` -> `Golden fanya`
pub fn slug_to_name(slug: &str) -> String {
    let spaced = slug.replace('-', " ").to_lowercase();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn is_card_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| e.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// List every card image in `dir`, sorted by file name. The directory is read
/// fresh on each call so added or removed files take effect immediately. A
/// missing directory is an empty catalog. Files with an unknown tier word
/// are skipped.
pub fn scan_catalog(dir: &Path) -> io::Result<Vec<CatalogEntry>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("card directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut catalog = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_card_image(&path) {
            continue;
        }
        let Ok(fname) = entry.file_name().into_string() else {
            tracing::warn!("skipping non UTF-8 card file: {}", path.display());
            continue;
        };
        let Some(card) = parse_card_filename(&fname) else {
            tracing::warn!("skipping card with unknown rarity: {}", fname);
            continue;
        };
        catalog.push(CatalogEntry { card, path });
    }
    catalog.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(catalog)
}
