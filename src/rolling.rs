use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::types::{GameRecord, SeasonRecord};

/// Market spread per game id, supplied when a game log lacks closing lines.
pub type SpreadLookup = HashMap<String, f64>;

const PUSH_BAND: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AtsRecord {
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
}

impl AtsRecord {
    pub fn decided(&self) -> u32 {
        self.wins + self.losses
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RollingMetrics {
    pub window_size: usize,
    pub games: usize,
    pub net_rating: f64,
    pub offensive_rating: f64,
    pub defensive_rating: f64,
    pub pace: f64,
    pub wins: u32,
    pub losses: u32,
    pub point_diff: f64,
    pub ats: AtsRecord,
    pub avg_cover_margin: f64,
    pub last_game_date: Option<NaiveDate>,
}

impl RollingMetrics {
    fn empty(window_size: usize) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.games == 0
    }

    pub fn record(&self) -> SeasonRecord {
        SeasonRecord::new(self.wins, self.losses, self.point_diff * self.games as f64)
    }
}

/// Summarize the `window_size` most recent games of a newest-first log.
pub fn compute_rolling_metrics(
    games: &[GameRecord],
    window_size: usize,
    spreads: Option<&SpreadLookup>,
    qualified_only: bool,
) -> Result<RollingMetrics, ModelError> {
    if window_size == 0 {
        return Err(ModelError::ZeroWindow);
    }

    let window: Vec<&GameRecord> = games
        .iter()
        .filter(|g| !qualified_only || g.qualified)
        .take(window_size)
        .collect();
    if window.is_empty() {
        return Ok(RollingMetrics::empty(window_size));
    }

    let n = window.len() as f64;
    let mut out = RollingMetrics::empty(window_size);
    out.games = window.len();
    out.last_game_date = window.first().map(|g| g.date);

    let mut cover_sum = 0.0;
    let mut cover_n = 0usize;
    for g in &window {
        out.net_rating += g.net_rating;
        out.offensive_rating += g.offensive_rating;
        out.defensive_rating += g.defensive_rating;
        out.pace += g.pace;
        out.point_diff += g.point_margin();
        if g.is_win() {
            out.wins += 1;
        } else {
            out.losses += 1;
        }

        let Some(lookup) = spreads else { continue };
        let Some(spread) = lookup.get(&g.id).copied().or(g.spread) else {
            continue;
        };
        let cover = g.point_margin() + spread;
        match cover_outcome(cover) {
            None => out.ats.pushes += 1,
            Some(true) => out.ats.wins += 1,
            Some(false) => out.ats.losses += 1,
        }
        cover_sum += cover;
        cover_n += 1;
    }

    out.net_rating /= n;
    out.offensive_rating /= n;
    out.defensive_rating /= n;
    out.pace /= n;
    out.point_diff /= n;
    if cover_n > 0 {
        out.avg_cover_margin = cover_sum / cover_n as f64;
    }
    Ok(out)
}

/// The four windows the net-rating blend reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WindowSet {
    pub last4: RollingMetrics,
    pub last7: RollingMetrics,
    pub last10: RollingMetrics,
    pub season: RollingMetrics,
}

impl WindowSet {
    pub fn from_games(
        games: &[GameRecord],
        spreads: Option<&SpreadLookup>,
        qualified_only: bool,
    ) -> Result<Self, ModelError> {
        let season_len = games.len().max(1);
        Ok(Self {
            last4: compute_rolling_metrics(games, 4, spreads, qualified_only)?,
            last7: compute_rolling_metrics(games, 7, spreads, qualified_only)?,
            last10: compute_rolling_metrics(games, 10, spreads, qualified_only)?,
            season: compute_rolling_metrics(games, season_len, spreads, qualified_only)?,
        })
    }

    pub fn games(&self) -> usize {
        self.season.games
    }

    pub fn last_game_date(&self) -> Option<NaiveDate> {
        self.season.last_game_date
    }
}

/// `None` for a push (within half a point of the line), else whether the line was covered.
pub fn cover_outcome(cover_margin: f64) -> Option<bool> {
    if cover_margin.abs() <= PUSH_BAND {
        None
    } else {
        Some(cover_margin > 0.0)
    }
}

/// Newest-first is required by every window; dates may repeat but never increase.
pub fn ensure_newest_first(games: &[GameRecord]) -> Result<(), ModelError> {
    match games.windows(2).position(|w| w[1].date > w[0].date) {
        Some(i) => Err(ModelError::UnsortedGameLog { index: i + 1 }),
        None => Ok(()),
    }
}
