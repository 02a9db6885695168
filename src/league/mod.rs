//! Roster and fixture provider for the simulator. Seeded from a JSON player
//! catalog; falls back to an empty catalog when the file is missing or invalid.

pub mod query_rules;
pub mod store;

use std::fs;
use std::path::Path;

use serde::Deserialize;

pub use query_rules::{check_query, classify, QueryKind, QueryRejection};
pub use store::{Kickoff, League, MatchDetails, MatchRecord, PlayerRecord, TeamRecord, BUDGET_LIMIT};

#[derive(Debug, Default, Deserialize)]
pub struct PlayerCatalog {
    #[serde(default)]
    pub players: Vec<PlayerRecord>,
}

pub fn load_player_catalog(path: &str) -> PlayerCatalog {
    let path = Path::new(path);
    if !path.exists() {
        tracing::warn!(path = %path.display(), "player catalog not found, starting empty");
        return PlayerCatalog::default();
    }
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "cannot read player catalog");
            return PlayerCatalog::default();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), error = %err, "invalid player catalog");
        PlayerCatalog::default()
    })
}

pub fn load_league(path: &str) -> League {
    let catalog = load_player_catalog(path);
    tracing::info!(players = catalog.players.len(), "player catalog loaded");
    League::with_players(catalog.players)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_catalog_is_empty() {
        let catalog = load_player_catalog("data/does-not-exist.json");
        assert!(catalog.players.is_empty());
    }

    #[test]
    fn bundled_catalog_parses() {
        let catalog = load_player_catalog(concat!(env!("CARGO_MANIFEST_DIR"), "/data/league.json"));
        assert!(catalog.players.len() >= 20);
        assert!(catalog.players.iter().all(|p| !p.signed && p.value > 0));
    }
}
