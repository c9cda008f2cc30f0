use once_cell::sync::Lazy;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_CONFIG, ModelConfig, WindowWeights};
use crate::conviction::{self, Conviction, ConvictionInputs};
use crate::elo;
use crate::error::ModelError;
use crate::rolling::{self, SpreadLookup, WindowSet};
use crate::trend::{self, TrendAnalysis};
use crate::types::{
    ConfidenceTier, GameRecord, OpponentTier, PredictionMode, SeasonRecord, UpcomingGame,
};
use crate::variance::{self, RegimeInputs};
use crate::wager::{self, WagerAnalysis};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadPrediction {
    pub game_id: String,
    pub opponent: String,
    /// Rounded and capped for display.
    pub predicted_margin: f64,
    /// Uncapped; drives cover probability and EV.
    pub raw_margin: f64,
    pub predicted_cover: f64,
    pub confidence: ConfidenceTier,
    pub confidence_score: f64,
    pub conviction: Conviction,
    pub sigma: f64,
    pub regime: String,
    pub elo_spread: f64,
    pub net_rating_spread: f64,
    pub elo_component: f64,
    pub net_rating_component: f64,
    pub elo_diff: f64,
    pub mode: PredictionMode,
    pub mode_used: PredictionMode,
    pub core_weight: f64,
    pub wager: Option<WagerAnalysis>,
    pub factors: Vec<Factor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModePredictions {
    pub standard: SpreadPrediction,
    pub buzzing: SpreadPrediction,
    pub bayesian: SpreadPrediction,
}

/// Everything one prediction reads. The game log is borrowed, never modified.
#[derive(Debug, Clone, Copy)]
pub struct PredictionContext<'a> {
    pub upcoming: &'a UpcomingGame,
    pub windows: &'a WindowSet,
    pub trend: &'a TrendAnalysis,
    /// Windows over qualified games only; derived from `games` when absent.
    pub core_windows: Option<&'a WindowSet>,
    /// Overrides the record implied by `windows.season` for the Elo estimate.
    pub season: Option<&'a SeasonRecord>,
    pub games: Option<&'a [GameRecord]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub windows: WindowSet,
    pub core_windows: WindowSet,
    pub trend: TrendAnalysis,
}

impl LogSnapshot {
    pub fn from_games(
        games: &[GameRecord],
        spreads: Option<&SpreadLookup>,
    ) -> Result<Self, ModelError> {
        rolling::ensure_newest_first(games)?;
        Ok(Self {
            windows: WindowSet::from_games(games, spreads, false)?,
            core_windows: WindowSet::from_games(games, spreads, true)?,
            trend: trend::analyze_trend(games),
        })
    }

    pub fn context<'a>(
        &'a self,
        upcoming: &'a UpcomingGame,
        games: Option<&'a [GameRecord]>,
    ) -> PredictionContext<'a> {
        PredictionContext {
            upcoming,
            windows: &self.windows,
            trend: &self.trend,
            core_windows: Some(&self.core_windows),
            season: None,
            games,
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    elo_spread: f64,
    elo_diff: f64,
    net_rating_spread: f64,
    margin: f64,
    factors: Vec<Factor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subset {
    Season,
    Core,
}

#[derive(Debug, Clone, Default)]
pub struct SpreadEngine {
    config: ModelConfig,
}

impl SpreadEngine {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn predict_margin(
        &self,
        ctx: &PredictionContext<'_>,
        mode: PredictionMode,
    ) -> Result<SpreadPrediction, ModelError> {
        let derived_core;
        let core_windows = match (ctx.core_windows, ctx.games) {
            (Some(core), _) => Some(core),
            (None, Some(games)) => {
                rolling::ensure_newest_first(games)?;
                derived_core = WindowSet::from_games(games, None, true)?;
                Some(&derived_core)
            }
            (None, None) if mode == PredictionMode::Buzzing => {
                return Err(ModelError::MissingGameLog);
            }
            (None, None) => None,
        };
        let core_windows = core_windows.filter(|c| c.games() > 0);

        let upcoming = ctx.upcoming;
        let days_since_core = core_windows
            .and_then(|c| c.last_game_date())
            .map(|d| (upcoming.date - d).num_days().max(0) as u32);
        let core_games = core_windows.map(|c| c.games()).unwrap_or(0);

        let season = self.candidate(ctx, ctx.windows, Subset::Season);

        let (mode_used, core_weight, blended) = match (mode, core_windows) {
            (PredictionMode::Standard, _) => (PredictionMode::Standard, 0.0, season),
            (_, None) => {
                tracing::warn!(
                    game_id = %upcoming.id,
                    requested = mode.as_str(),
                    "no core-subset games; falling back to standard"
                );
                (PredictionMode::Standard, 0.0, season)
            }
            (PredictionMode::Buzzing, Some(core)) => {
                (PredictionMode::Buzzing, 1.0, self.candidate(ctx, core, Subset::Core))
            }
            (PredictionMode::Bayesian, Some(core)) => {
                let core_candidate = self.candidate(ctx, core, Subset::Core);
                let (prior, sample) =
                    self.bayesian_weights(core_games, days_since_core.unwrap_or(0));
                let wc = sample / (prior + sample);
                (
                    PredictionMode::Bayesian,
                    wc,
                    blend_candidates(&season, &core_candidate, 1.0 - wc, wc),
                )
            }
        };

        let cfg = &self.config;
        let raw_margin = blended.margin;
        let predicted_margin = round1(raw_margin.clamp(-cfg.blend.display_cap, cfg.blend.display_cap));
        let predicted_cover = predicted_cover(predicted_margin, upcoming.spread);

        let core_driven = mode_used == PredictionMode::Buzzing
            || (mode_used == PredictionMode::Bayesian && core_weight > 0.5);
        let pace_windows = match (core_driven, core_windows) {
            (true, Some(core)) => core,
            _ => ctx.windows,
        };
        let combined_pace = self.combined_pace(pace_windows, upcoming);

        let regime = variance::calculate_variance(
            &RegimeInputs {
                core_driven,
                combined_pace,
                opponent_net_rating: upcoming.opponent_net_rating.unwrap_or(0.0),
                days_since_core_game: days_since_core,
                predicted_margin: raw_margin,
            },
            &cfg.variance,
            &cfg.tiers,
        );

        let conviction = conviction::score_conviction(
            &ConvictionInputs {
                combined_pace,
                sigma: regime.sigma,
                base_sigma: cfg.variance.base_sigma,
                core_games,
                days_since_core_game: days_since_core,
                rest_days: upcoming.rest_days,
                is_back_to_back: upcoming.is_back_to_back,
                injury_report: upcoming.injury_report.as_ref(),
                elo_spread: blended.elo_spread,
                net_rating_spread: blended.net_rating_spread,
                market_spread: upcoming.spread,
            },
            &cfg.conviction,
        );

        let sample_games = match mode_used {
            PredictionMode::Buzzing => core_games,
            _ => ctx.windows.games(),
        };
        let confidence_score = self.confidence_score(
            sample_games,
            ctx.trend.consistency,
            upcoming.spread.map(|_| predicted_cover),
            blended.elo_spread,
            blended.net_rating_spread,
        );

        let wager = wager::analyze_wager(
            raw_margin,
            regime.sigma,
            upcoming.spread,
            upcoming.moneyline,
            blended.elo_diff,
            &cfg.wager,
        );

        tracing::debug!(
            game_id = %upcoming.id,
            mode = mode_used.as_str(),
            raw_margin,
            sigma = regime.sigma,
            regime = %regime.label,
            "spread prediction"
        );

        Ok(SpreadPrediction {
            game_id: upcoming.id.clone(),
            opponent: upcoming.opponent.clone(),
            predicted_margin,
            raw_margin,
            predicted_cover,
            confidence: self.confidence_tier(confidence_score),
            confidence_score,
            conviction,
            sigma: regime.sigma,
            regime: regime.label,
            elo_spread: blended.elo_spread,
            net_rating_spread: blended.net_rating_spread,
            elo_component: cfg.blend.elo_weight * blended.elo_spread,
            net_rating_component: cfg.blend.net_rating_weight * blended.net_rating_spread,
            elo_diff: blended.elo_diff,
            mode,
            mode_used,
            core_weight,
            wager,
            factors: blended.factors,
        })
    }

    /// Re-scores only the mode-consensus part of conviction. Margin and every other
    /// field are left as they were, so applying it twice changes nothing.
    pub fn apply_mode_consensus(
        &self,
        prediction: &SpreadPrediction,
        modes: [&SpreadPrediction; 3],
        spread: Option<f64>,
    ) -> SpreadPrediction {
        let agreeing = cover_agreement(&modes, spread);
        let bonus = conviction::mode_consensus_bonus(agreeing, &self.config.conviction);
        let mut out = prediction.clone();
        out.conviction = prediction.conviction.with_mode_consensus(bonus);
        out
    }

    pub fn predict_all_modes(
        &self,
        ctx: &PredictionContext<'_>,
    ) -> Result<ModePredictions, ModelError> {
        let standard = self.predict_margin(ctx, PredictionMode::Standard)?;
        let buzzing = if ctx.core_windows.is_none() && ctx.games.is_none() {
            // Nothing core-specific to read; buzzing mirrors standard.
            let mut p = standard.clone();
            p.mode = PredictionMode::Buzzing;
            p
        } else {
            self.predict_margin(ctx, PredictionMode::Buzzing)?
        };
        let bayesian = self.predict_margin(ctx, PredictionMode::Bayesian)?;

        let spread = ctx.upcoming.spread;
        let all = [&standard, &buzzing, &bayesian];
        Ok(ModePredictions {
            standard: self.apply_mode_consensus(&standard, all, spread),
            buzzing: self.apply_mode_consensus(&buzzing, all, spread),
            bayesian: self.apply_mode_consensus(&bayesian, all, spread),
        })
    }

    /// Predicts every upcoming game in parallel against one newest-first log. Output
    /// order matches `upcoming`.
    pub fn predict_slate(
        &self,
        games: &[GameRecord],
        upcoming: &[UpcomingGame],
        spreads: Option<&SpreadLookup>,
    ) -> Result<Vec<ModePredictions>, ModelError> {
        let snapshot = LogSnapshot::from_games(games, spreads)?;
        upcoming
            .par_iter()
            .map(|game| self.predict_all_modes(&snapshot.context(game, Some(games))))
            .collect()
    }

    fn bayesian_weights(&self, core_games: usize, days_since_core: u32) -> (f64, f64) {
        let b = &self.config.blend;
        let n = core_games as f64;
        let prior = b.prior_floor + b.prior_range * (-n / b.prior_decay_games.max(1.0)).exp();
        let sample = n * (-(days_since_core as f64) / b.staleness_days.max(1.0)).exp();
        (prior, sample)
    }

    fn candidate(&self, ctx: &PredictionContext<'_>, windows: &WindowSet, subset: Subset) -> Candidate {
        let cfg = &self.config;
        let upcoming = ctx.upcoming;
        let adj = &cfg.adjustments;

        let own_record = match (subset, ctx.season) {
            (Subset::Season, Some(record)) => *record,
            _ => windows.season.record(),
        };
        let own_rating = elo::rating_for_record(&own_record, true, &cfg.rating);
        let opponent_rating = match (&upcoming.opponent_record, upcoming.opponent_net_rating) {
            (Some(record), _) => elo::rating_for_record(record, true, &cfg.rating),
            (None, Some(nr)) => elo::rating_from_net_rating(nr, &cfg.rating),
            (None, None) => cfg.rating.baseline,
        };
        let own_fatigued = upcoming.is_back_to_back || upcoming.rest_days == 0;
        let elo_spread = elo::elo_spread(
            own_rating,
            opponent_rating,
            upcoming.is_home,
            own_fatigued,
            upcoming.opponent_back_to_back,
            &cfg.elo,
        );
        let elo_diff = elo_spread * cfg.elo.pts_per_spread_point.max(1.0);

        let weights = match subset {
            Subset::Season => &cfg.net_rating.standard_weights,
            Subset::Core => &cfg.net_rating.core_weights,
        };
        let form = weighted_net_rating(windows, weights);

        let mut nr: Vec<Factor> = Vec::new();
        nr.push(factor("Net rating form", form));
        if upcoming.is_home {
            nr.push(factor("Home court", adj.home_court));
        } else {
            nr.push(factor("Road", -adj.home_court));
        }

        if let Some(opp_nr) = upcoming.opponent_net_rating {
            nr.push(factor("Opponent strength", -opp_nr * adj.opponent_weight));
            match OpponentTier::classify(opp_nr, &cfg.tiers) {
                OpponentTier::Elite => nr.push(factor("Elite opponent", adj.elite_penalty)),
                OpponentTier::Mid if form.abs() < adj.mid_tier_band => {
                    nr.push(factor("Mid-tier correction", adj.mid_tier_correction));
                }
                _ => {}
            }
        }

        if own_fatigued {
            nr.push(factor("Back-to-back", adj.back_to_back));
        } else if upcoming.rest_days >= adj.rest_bonus_days {
            nr.push(factor("Rest advantage", adj.rest_bonus));
        }
        if upcoming.opponent_back_to_back {
            nr.push(factor("Opponent back-to-back", -adj.back_to_back));
        }
        if let Some(opp_rest) = upcoming.opponent_rest_days {
            let cap = adj.rest_diff_cap_days as i64;
            let diff = (upcoming.rest_days as i64 - opp_rest as i64).clamp(-cap, cap);
            if diff != 0 {
                nr.push(factor("Rest differential", diff as f64 * adj.rest_diff_per_day));
            }
        }

        if let Some(trade) = cfg.trade_adjustment(&upcoming.opponent) {
            let name = if trade.note.is_empty() {
                format!("Trade: {}", trade.opponent)
            } else {
                format!("Trade: {}", trade.note)
            };
            nr.push(factor(&name, trade.points));
        }
        for transition in cfg.active_transitions(upcoming.date) {
            nr.push(factor(&format!("Roster transition: {}", transition.label), transition.points));
        }

        if adj.momentum_weight != 0.0 {
            nr.push(factor("Momentum", ctx.trend.momentum * adj.momentum_weight));
        }
        if subset == Subset::Core {
            nr.push(factor("Core risk", adj.core_risk_penalty));
        }

        let net_rating_spread: f64 = nr.iter().map(|f| f.impact).sum();
        let b = &cfg.blend;
        let margin = b.elo_weight * elo_spread + b.net_rating_weight * net_rating_spread;

        let mut factors = Vec::with_capacity(nr.len() + 1);
        factors.push(factor("Elo edge", b.elo_weight * elo_spread));
        factors.extend(nr.into_iter().map(|f| Factor {
            impact: f.impact * b.net_rating_weight,
            name: f.name,
        }));

        tracing::trace!(?subset, elo_spread, net_rating_spread, margin, "candidate margin");
        Candidate {
            elo_spread,
            elo_diff,
            net_rating_spread,
            margin,
            factors,
        }
    }

    fn combined_pace(&self, windows: &WindowSet, upcoming: &UpcomingGame) -> f64 {
        let avg = self.config.variance.league_avg_pace;
        let own = if windows.last10.games > 0 && windows.last10.pace > 0.0 {
            windows.last10.pace
        } else {
            avg
        };
        own + upcoming.opponent_pace.unwrap_or(avg)
    }

    fn confidence_score(
        &self,
        sample_games: usize,
        consistency: f64,
        predicted_cover: Option<f64>,
        elo_spread: f64,
        net_rating_spread: f64,
    ) -> f64 {
        let c = &self.config.confidence;
        let sample = (sample_games as f64 / c.sample_games.max(1.0)).min(1.0) * c.sample_points;
        let steady = consistency.clamp(0.0, 1.0) * c.consistency_points;
        let cover = predicted_cover
            .map(|v| (v.abs() / c.cover_scale.max(0.1)).min(1.0) * c.cover_points)
            .unwrap_or(0.0);
        let agreement = if elo_spread.signum() == net_rating_spread.signum() {
            let gap = (elo_spread - net_rating_spread).abs();
            (1.0 - gap / c.agreement_scale.max(0.1)).max(0.0) * c.agreement_points
        } else {
            0.0
        };
        (sample + steady + cover + agreement).clamp(0.0, 100.0)
    }

    fn confidence_tier(&self, score: f64) -> ConfidenceTier {
        let c = &self.config.confidence;
        if score >= c.high_threshold {
            ConfidenceTier::High
        } else if score < c.low_threshold {
            ConfidenceTier::Low
        } else {
            ConfidenceTier::Medium
        }
    }
}

static DEFAULT_ENGINE: Lazy<SpreadEngine> = Lazy::new(|| SpreadEngine::new(DEFAULT_CONFIG.clone()));

pub fn predict_margin(
    ctx: &PredictionContext<'_>,
    mode: PredictionMode,
) -> Result<SpreadPrediction, ModelError> {
    DEFAULT_ENGINE.predict_margin(ctx, mode)
}

pub fn apply_mode_consensus(
    prediction: &SpreadPrediction,
    modes: [&SpreadPrediction; 3],
    spread: Option<f64>,
) -> SpreadPrediction {
    DEFAULT_ENGINE.apply_mode_consensus(prediction, modes, spread)
}

// Largest group of modes on one side of the line; a dead-even margin casts no vote.
fn cover_agreement(modes: &[&SpreadPrediction; 3], spread: Option<f64>) -> usize {
    let Some(s) = spread else { return 0 };
    let covers = modes.iter().filter(|p| p.raw_margin + s > 0.0).count();
    let fails = modes.iter().filter(|p| p.raw_margin + s < 0.0).count();
    covers.max(fails)
}

fn predicted_cover(predicted_margin: f64, spread: Option<f64>) -> f64 {
    spread.map(|s| round1(predicted_margin + s)).unwrap_or(0.0)
}

fn weighted_net_rating(windows: &WindowSet, w: &WindowWeights) -> f64 {
    let parts = [
        (&windows.last4, w.last4),
        (&windows.last7, w.last7),
        (&windows.last10, w.last10),
        (&windows.season, w.season),
    ];
    let mut sum = 0.0;
    let mut weight = 0.0;
    for (m, wt) in parts {
        if m.games == 0 {
            continue;
        }
        sum += m.net_rating * wt;
        weight += wt;
    }
    if weight <= 0.0 { 0.0 } else { sum / weight }
}

fn blend_candidates(a: &Candidate, b: &Candidate, wa: f64, wb: f64) -> Candidate {
    let mut factors: Vec<Factor> = Vec::with_capacity(a.factors.len() + 1);
    for f in &a.factors {
        factors.push(Factor {
            name: f.name.clone(),
            impact: f.impact * wa,
        });
    }
    for f in &b.factors {
        match factors.iter_mut().find(|x| x.name == f.name) {
            Some(x) => x.impact += f.impact * wb,
            None => factors.push(Factor {
                name: f.name.clone(),
                impact: f.impact * wb,
            }),
        }
    }
    Candidate {
        elo_spread: wa * a.elo_spread + wb * b.elo_spread,
        elo_diff: wa * a.elo_diff + wb * b.elo_diff,
        net_rating_spread: wa * a.net_rating_spread + wb * b.net_rating_spread,
        margin: wa * a.margin + wb * b.margin,
        factors,
    }
}

fn factor(name: &str, impact: f64) -> Factor {
    Factor {
        name: name.to_string(),
        impact,
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
