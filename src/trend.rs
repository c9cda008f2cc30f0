use serde::{Deserialize, Serialize};

use crate::types::{GameRecord, GameResult};

const MIN_GAMES: usize = 4;
const SHORT_WINDOW: usize = 4;
const LONG_WINDOW: usize = 10;
const MOMENTUM_SCALE: f64 = 0.8;
const MOMENTUM_CAP: f64 = 10.0;
const DIRECTION_THRESHOLD: f64 = 2.0;
const CONSISTENCY_SPREAD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub momentum: f64,
    pub consistency: f64,
    pub streak: Option<GameResult>,
    pub streak_len: u32,
    pub sample: usize,
}

impl TrendAnalysis {
    pub fn neutral() -> Self {
        Self {
            direction: TrendDirection::Stable,
            momentum: 0.0,
            consistency: 0.5,
            streak: None,
            streak_len: 0,
            sample: 0,
        }
    }
}

impl Default for TrendAnalysis {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Short-versus-long net rating swing over the qualified games of a newest-first log.
pub fn analyze_trend(games: &[GameRecord]) -> TrendAnalysis {
    let qualified: Vec<&GameRecord> = games.iter().filter(|g| g.qualified).collect();
    if qualified.len() < MIN_GAMES {
        return TrendAnalysis::neutral();
    }

    let long: Vec<&GameRecord> = qualified.iter().copied().take(LONG_WINDOW).collect();
    let short_nr = mean(qualified.iter().take(SHORT_WINDOW).map(|g| g.net_rating));
    let long_nr = mean(long.iter().map(|g| g.net_rating));

    let momentum = ((short_nr - long_nr) * MOMENTUM_SCALE).clamp(-MOMENTUM_CAP, MOMENTUM_CAP);
    let direction = if momentum > DIRECTION_THRESHOLD {
        TrendDirection::Up
    } else if momentum < -DIRECTION_THRESHOLD {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };

    let sd = std_dev(long.iter().map(|g| g.point_margin()));
    let consistency = (1.0 - sd / CONSISTENCY_SPREAD).clamp(0.0, 1.0);

    let head = qualified[0].result;
    let streak_len = qualified.iter().take_while(|g| g.result == head).count() as u32;

    TrendAnalysis {
        direction,
        momentum,
        consistency,
        streak: Some(head),
        streak_len,
        sample: long.len(),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 { 0.0 } else { sum / n as f64 }
}

// Population standard deviation.
fn std_dev(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let m = mean(values.clone());
    let mut sq = 0.0;
    let mut n = 0usize;
    for v in values {
        sq += (v - m).powi(2);
        n += 1;
    }
    if n == 0 { 0.0 } else { (sq / n as f64).sqrt() }
}
