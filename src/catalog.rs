//! Hero catalog: the tank list from the stats service merged with the local
//! matchup table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One hero as listed by the stats service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroDescriptor {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub portrait: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Fields the widget does not interpret, passed through to windows
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Counters for one hero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Matchup {
    /// Heroes this hero does well against
    pub favorable: Vec<String>,
    /// Heroes that counter this hero
    pub unfavorable: Vec<String>,
}

pub type MatchupTable = BTreeMap<String, Matchup>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeroCatalog {
    pub heroes: Vec<HeroDescriptor>,
    /// Keyed by [`HeroDescriptor::key`]
    pub matchups: MatchupTable,
}

/// Spelling-insensitive hero identity: "D.Va", "Dva" and "dva" are one hero
pub fn hero_slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

impl HeroCatalog {
    /// Attach matchups to the fetched hero list. Hero order is kept; matchup
    /// entries for heroes the service did not list are dropped.
    pub fn merge(heroes: Vec<HeroDescriptor>, table: MatchupTable) -> Self {
        let by_slug: BTreeMap<String, Matchup> = table
            .into_iter()
            .map(|(name, matchup)| (hero_slug(&name), matchup))
            .collect();

        let mut matchups = MatchupTable::new();
        for hero in &heroes {
            let found = by_slug
                .get(&hero_slug(&hero.key))
                .or_else(|| by_slug.get(&hero_slug(&hero.name)));
            if let Some(matchup) = found {
                matchups.insert(hero.key.clone(), matchup.clone());
            }
        }

        HeroCatalog { heroes, matchups }
    }
}

/// Parse a matchup table file
pub fn load_matchups(path: &Path) -> Result<MatchupTable> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Read the first matchup file that exists. No file, or a broken one, gives an
/// empty table so the hero list is still delivered.
pub fn load_first_matchups(candidates: &[PathBuf]) -> MatchupTable {
    let Some(path) = candidates.iter().find(|p| p.exists()) else {
        tracing::warn!("No matchup table found, tried {:?}", candidates);
        return MatchupTable::new();
    };

    match load_matchups(path) {
        Ok(table) => {
            tracing::info!("Loaded {} matchups from {}", table.len(), path.display());
            table
        }
        Err(e) => {
            tracing::warn!("{:#}", e);
            MatchupTable::new()
        }
    }
}

#[cfg(test)]
pub(crate) fn hero(key: &str, name: &str) -> HeroDescriptor {
    HeroDescriptor {
        key: key.to_string(),
        name: name.to_string(),
        portrait: None,
        role: Some("tank".to_string()),
        extra: Map::new(),
    }
}
