use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use crate::calibration::{self, CalibrationBin, Forecast, Metrics};
use crate::error::ModelError;
use crate::model::{LogSnapshot, SpreadEngine};
use crate::rolling;
use crate::types::{GameRecord, OpponentTier, PredictionMode, UpcomingGame};
use crate::wager::normal_cdf;

#[derive(Debug, Clone, Copy)]
pub struct BacktestSettings {
    pub min_history: usize,
    pub mode: PredictionMode,
    pub calibration_bins: usize,
    /// Segments with fewer graded games than this are flagged as thin.
    pub min_segment_games: u32,
    /// Average-error gap, in points, before a segment is reported as biased.
    pub bias_threshold: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            min_history: 5,
            mode: PredictionMode::Bayesian,
            calibration_bins: 10,
            min_segment_games: 15,
            bias_threshold: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestRow {
    pub game_id: String,
    pub date: NaiveDate,
    pub opponent: String,
    pub is_home: bool,
    pub qualified: bool,
    pub opponent_tier: OpponentTier,
    pub rest_days: u32,
    pub is_back_to_back: bool,
    pub predicted_margin: f64,
    pub raw_margin: f64,
    pub actual_margin: f64,
    pub spread: Option<f64>,
    pub sigma: f64,
    pub cover_probability: Option<f64>,
    pub elo_margin: f64,
    pub net_rating_margin: f64,
    pub mode_used: PredictionMode,
}

impl BacktestRow {
    fn forecast(&self) -> Forecast {
        Forecast {
            predicted_margin: self.predicted_margin,
            actual_margin: self.actual_margin,
            spread: self.spread,
            cover_probability: self.cover_probability,
            elo_margin: Some(self.elo_margin),
            net_rating_margin: Some(self.net_rating_margin),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketStats {
    pub label: String,
    pub count: usize,
    pub mae: f64,
    pub avg_predicted: f64,
    pub avg_actual: f64,
    pub ats_wins: u32,
    pub ats_graded: u32,
    pub ats_rate: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub sample_sufficient: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasNote {
    pub bucket: String,
    /// `"overpredict"` or `"underpredict"`.
    pub direction: &'static str,
    pub points: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub mode: PredictionMode,
    pub rows: Vec<BacktestRow>,
    pub metrics: Metrics,
    pub buckets: Vec<BucketStats>,
    pub biases: Vec<BiasNote>,
    pub calibration: Vec<CalibrationBin>,
}

/// Walk forward through a newest-first log, predicting each game from strictly
/// earlier games only.
pub fn run_backtest(
    engine: &SpreadEngine,
    games: &[GameRecord],
    settings: &BacktestSettings,
) -> Result<BacktestReport, ModelError> {
    rolling::ensure_newest_first(games)?;

    let mut rows = (0..games.len())
        .into_par_iter()
        .filter(|i| games.len() - i - 1 >= settings.min_history)
        .map(|i| predict_one(engine, &games[i], &games[i + 1..], settings.mode))
        .collect::<Result<Vec<_>, _>>()?;
    rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.game_id.cmp(&b.game_id)));

    let forecasts: Vec<Forecast> = rows.iter().map(|r| r.forecast()).collect();
    let metrics = calibration::evaluate(&forecasts);

    let (probs, outcomes): (Vec<f64>, Vec<bool>) = forecasts
        .iter()
        .filter_map(|f| Some((f.cover_probability?, f.covered()?)))
        .unzip();
    let calibration = calibration::calibration_bins(&probs, &outcomes, settings.calibration_bins);

    tracing::info!(
        games = rows.len(),
        mae = metrics.mae,
        ats = metrics.ats_accuracy,
        "backtest complete"
    );

    let buckets = bucket_stats(&rows, settings.min_segment_games);
    let biases = identify_biases(&buckets, settings.bias_threshold);
    for b in &biases {
        tracing::debug!(bucket = %b.bucket, direction = b.direction, points = b.points, "segment bias");
    }

    Ok(BacktestReport {
        mode: settings.mode,
        buckets,
        biases,
        rows,
        metrics,
        calibration,
    })
}

fn predict_one(
    engine: &SpreadEngine,
    game: &GameRecord,
    prior: &[GameRecord],
    mode: PredictionMode,
) -> Result<BacktestRow, ModelError> {
    let upcoming = upcoming_from_record(game);
    let snapshot = LogSnapshot::from_games(prior, None)?;
    let p = engine.predict_margin(&snapshot.context(&upcoming, Some(prior)), mode)?;
    let cover_probability = game
        .spread
        .map(|s| normal_cdf((p.raw_margin + s) / p.sigma.max(1e-6)));

    Ok(BacktestRow {
        game_id: game.id.clone(),
        date: game.date,
        opponent: game.opponent.clone(),
        is_home: game.is_home,
        qualified: game.qualified,
        opponent_tier: OpponentTier::classify(
            game.opponent_net_rating.unwrap_or(0.0),
            &engine.config().tiers,
        ),
        rest_days: game.rest_days,
        is_back_to_back: game.is_back_to_back,
        predicted_margin: p.predicted_margin,
        raw_margin: p.raw_margin,
        actual_margin: game.point_margin(),
        spread: game.spread,
        sigma: p.sigma,
        cover_probability,
        elo_margin: p.elo_spread,
        net_rating_margin: p.net_rating_spread,
        mode_used: p.mode_used,
    })
}

/// Replays a finished game as if it were still upcoming.
pub fn upcoming_from_record(game: &GameRecord) -> UpcomingGame {
    let mut up = UpcomingGame::new(game.id.clone(), game.date, game.opponent.clone(), game.is_home);
    up.spread = game.spread;
    up.moneyline = game.moneyline;
    up.implied_win_prob = game.implied_win_prob;
    up.opponent_net_rating = game.opponent_net_rating;
    up.opponent_pace = game.opponent_pace;
    up.rest_days = game.rest_days;
    up.is_back_to_back = game.is_back_to_back;
    up
}

fn bucket_stats(rows: &[BacktestRow], min_sample: u32) -> Vec<BucketStats> {
    let mut out = Vec::new();
    for tier in OpponentTier::ALL {
        push_bucket(&mut out, &format!("vs_{}", tier.label()), rows, min_sample, |r| {
            r.opponent_tier == tier
        });
    }
    push_bucket(&mut out, "home", rows, min_sample, |r| r.is_home);
    push_bucket(&mut out, "away", rows, min_sample, |r| !r.is_home);
    push_bucket(&mut out, "back_to_back", rows, min_sample, |r| {
        r.rest_days == 0 || r.is_back_to_back
    });
    push_bucket(&mut out, "1_day_rest", rows, min_sample, |r| {
        r.rest_days == 1 && !r.is_back_to_back
    });
    push_bucket(&mut out, "2plus_rest", rows, min_sample, |r| {
        r.rest_days >= 2 && !r.is_back_to_back
    });
    push_bucket(&mut out, "qualified", rows, min_sample, |r| r.qualified);
    push_bucket(&mut out, "unqualified", rows, min_sample, |r| !r.qualified);
    out
}

fn push_bucket(
    out: &mut Vec<BucketStats>,
    label: &str,
    rows: &[BacktestRow],
    min_sample: u32,
    keep: impl Fn(&BacktestRow) -> bool,
) {
    let picked: Vec<&BacktestRow> = rows.iter().filter(|r| keep(r)).collect();
    if let Some(stats) = segment(label, &picked, min_sample) {
        out.push(stats);
    }
}

fn segment(label: &str, picked: &[&BacktestRow], min_sample: u32) -> Option<BucketStats> {
    if picked.is_empty() {
        return None;
    }
    let n = picked.len() as f64;
    let hits: Vec<bool> = picked.iter().filter_map(|r| r.forecast().ats_hit()).collect();
    let ats_graded = hits.len() as u32;
    let ats_wins = hits.iter().filter(|h| **h).count() as u32;
    let (ci_lower, ci_upper) = calibration::wilson_interval(ats_wins, ats_graded, 1.96);

    Some(BucketStats {
        label: label.to_string(),
        count: picked.len(),
        mae: picked
            .iter()
            .map(|r| (r.predicted_margin - r.actual_margin).abs())
            .sum::<f64>()
            / n,
        avg_predicted: picked.iter().map(|r| r.predicted_margin).sum::<f64>() / n,
        avg_actual: picked.iter().map(|r| r.actual_margin).sum::<f64>() / n,
        ats_wins,
        ats_graded,
        ats_rate: if ats_graded > 0 {
            ats_wins as f64 / ats_graded as f64
        } else {
            0.5
        },
        ci_lower,
        ci_upper,
        sample_sufficient: ats_graded >= min_sample,
    })
}

/// Segments whose average prediction misses the average result by at least `threshold` points.
pub fn identify_biases(buckets: &[BucketStats], threshold: f64) -> Vec<BiasNote> {
    buckets
        .iter()
        .filter_map(|b| {
            let gap = b.avg_predicted - b.avg_actual;
            (gap.abs() >= threshold).then(|| BiasNote {
                bucket: b.label.clone(),
                direction: if gap > 0.0 { "overpredict" } else { "underpredict" },
                points: (gap.abs() * 10.0).round() / 10.0,
                count: b.count,
            })
        })
        .collect()
}
