use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::{GameRecord, UpcomingGame};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GameLogFile {
    Bare(Vec<GameRecord>),
    Wrapped {
        #[serde(default)]
        games: Vec<GameRecord>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UpcomingFile {
    Bare(Vec<UpcomingGame>),
    Wrapped {
        #[serde(default, alias = "upcomingGames")]
        upcoming: Vec<UpcomingGame>,
    },
}

/// Decode a game log, then put it newest-first with duplicate ids dropped.
///
/// Accepts either a bare array or an object with a `games` array; `null` is an empty log.
pub fn parse_game_log_json(raw: &str) -> Result<Vec<GameRecord>> {
    let parsed: Option<GameLogFile> = serde_json::from_str(raw).context("decode game log")?;
    let games = match parsed {
        None => Vec::new(),
        Some(GameLogFile::Bare(games)) => games,
        Some(GameLogFile::Wrapped { games }) => games,
    };
    Ok(normalize_game_log(games))
}

pub fn parse_upcoming_json(raw: &str) -> Result<Vec<UpcomingGame>> {
    let parsed: Option<UpcomingFile> = serde_json::from_str(raw).context("decode upcoming games")?;
    let mut upcoming = match parsed {
        None => Vec::new(),
        Some(UpcomingFile::Bare(rows)) => rows,
        Some(UpcomingFile::Wrapped { upcoming }) => upcoming,
    };
    upcoming.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    Ok(upcoming)
}

pub fn load_game_log(path: &Path) -> Result<Vec<GameRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read game log {}", path.display()))?;
    parse_game_log_json(&raw).with_context(|| format!("parse game log {}", path.display()))
}

pub fn load_upcoming(path: &Path) -> Result<Vec<UpcomingGame>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read upcoming games {}", path.display()))?;
    parse_upcoming_json(&raw).with_context(|| format!("parse upcoming games {}", path.display()))
}

/// Newest-first by date, ties broken by id descending; the first copy of an id wins.
pub fn normalize_game_log(mut games: Vec<GameRecord>) -> Vec<GameRecord> {
    let mut seen = HashSet::new();
    games.retain(|g| seen.insert(g.id.clone()));
    games.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    games
}
