use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "SPREAD_MODEL_CONFIG";

pub static DEFAULT_CONFIG: Lazy<ModelConfig> = Lazy::new(ModelConfig::default);

/// Every tuning constant the pipeline reads. Built once and shared read-only, so a
/// backtest sweep can run many configurations side by side.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModelConfig {
    pub rating: RatingConfig,
    pub tiers: TierConfig,
    pub elo: EloConfig,
    pub net_rating: NetRatingConfig,
    pub adjustments: AdjustmentConfig,
    pub blend: BlendConfig,
    pub variance: VarianceConfig,
    pub conviction: ConvictionConfig,
    pub confidence: ConfidenceConfig,
    pub wager: WagerConfig,
    pub trade_adjustments: Vec<TradeAdjustment>,
    pub roster_transitions: Vec<RosterTransition>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub baseline: f64,
    pub win_pct_intercept: f64,
    pub win_pct_scale: f64,
    pub floor: f64,
    pub ceiling: f64,
    pub points_per_diff: f64,
    pub diff_cap: f64,
    // Win-rate weight falls linearly to the floor over this many games.
    pub win_weight_horizon_games: f64,
    pub min_diff_weight: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            baseline: 1500.0,
            win_pct_intercept: 1504.6,
            win_pct_scale: 450.0,
            floor: 1200.0,
            ceiling: 1800.0,
            points_per_diff: 10.0,
            diff_cap: 20.0,
            win_weight_horizon_games: 30.0,
            min_diff_weight: 0.60,
        }
    }
}

/// Opponent net-rating cutoffs, each the lower bound of its tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub elite: f64,
    pub strong: f64,
    pub mid: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            elite: 6.0,
            strong: 3.0,
            mid: -3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EloConfig {
    pub home_adv_pts: f64,
    pub fatigue_pts: f64,
    pub pts_per_spread_point: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            home_adv_pts: 70.0,
            fatigue_pts: 46.0,
            pts_per_spread_point: 28.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowWeights {
    pub last4: f64,
    pub last7: f64,
    pub last10: f64,
    pub season: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct NetRatingConfig {
    pub standard_weights: WindowWeights,
    pub core_weights: WindowWeights,
}

impl Default for WindowWeights {
    fn default() -> Self {
        Self {
            last4: 0.40,
            last7: 0.30,
            last10: 0.20,
            season: 0.10,
        }
    }
}

impl Default for NetRatingConfig {
    fn default() -> Self {
        Self {
            standard_weights: WindowWeights::default(),
            // The core subset is small, so its season window carries more of the load.
            core_weights: WindowWeights {
                last4: 0.35,
                last7: 0.30,
                last10: 0.20,
                season: 0.15,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentConfig {
    pub home_court: f64,
    pub opponent_weight: f64,
    pub back_to_back: f64,
    pub rest_bonus: f64,
    pub rest_bonus_days: u32,
    pub elite_penalty: f64,
    // Own form must sit inside this band for the mid-tier correction.
    pub mid_tier_band: f64,
    pub mid_tier_correction: f64,
    pub rest_diff_per_day: f64,
    pub rest_diff_cap_days: u32,
    pub core_risk_penalty: f64,
    // Zero disables the momentum factor.
    pub momentum_weight: f64,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            home_court: 2.5,
            opponent_weight: 1.0,
            back_to_back: -3.0,
            rest_bonus: 1.0,
            rest_bonus_days: 2,
            elite_penalty: -2.0,
            mid_tier_band: 3.0,
            mid_tier_correction: -1.5,
            rest_diff_per_day: 0.5,
            rest_diff_cap_days: 2,
            core_risk_penalty: -1.25,
            momentum_weight: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub elo_weight: f64,
    pub net_rating_weight: f64,
    pub prior_floor: f64,
    pub prior_range: f64,
    pub prior_decay_games: f64,
    pub staleness_days: f64,
    pub display_cap: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            elo_weight: 0.55,
            net_rating_weight: 0.45,
            prior_floor: 20.0,
            prior_range: 40.0,
            prior_decay_games: 40.0,
            staleness_days: 30.0,
            display_cap: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VarianceConfig {
    pub base_sigma: f64,
    pub core_boost: f64,
    pub high_pace_threshold: f64,
    pub high_pace_boost: f64,
    pub elite_boost: f64,
    pub echo_boost: f64,
    pub echo_window_days: f64,
    pub margin_coefficient: f64,
    pub blowout_label_margin: f64,
    pub league_avg_pace: f64,
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            base_sigma: 12.0,
            core_boost: 4.0,
            high_pace_threshold: 202.0,
            high_pace_boost: 3.0,
            elite_boost: 3.5,
            echo_boost: 3.0,
            echo_window_days: 60.0,
            margin_coefficient: 0.20,
            blowout_label_margin: 10.0,
            league_avg_pace: 99.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvictionConfig {
    pub calm_pace: f64,
    pub frantic_pace: f64,
    pub pace_max: f64,
    pub pace_min: f64,
    pub haircut_per_sigma: f64,
    pub max_haircut: f64,
    pub freshness_max: f64,
    pub freshness_decay_days: f64,
    pub rest_back_to_back: f64,
    pub rest_one_day: f64,
    pub rest_full: f64,
    pub health_max: f64,
    pub health_out: f64,
    pub health_doubtful: f64,
    pub health_questionable: f64,
    pub health_probable: f64,
    pub agreement_points: f64,
    pub agreement_unknown: f64,
    pub injury_points_per_point: f64,
    pub injury_max: f64,
    pub consensus_full: f64,
    pub consensus_partial: f64,
}

impl Default for ConvictionConfig {
    fn default() -> Self {
        Self {
            calm_pace: 196.0,
            frantic_pace: 208.0,
            pace_max: 30.0,
            pace_min: 10.0,
            haircut_per_sigma: 2.5,
            max_haircut: 15.0,
            freshness_max: 20.0,
            freshness_decay_days: 30.0,
            rest_back_to_back: 0.0,
            rest_one_day: 5.0,
            rest_full: 10.0,
            health_max: 5.0,
            health_out: 3.0,
            health_doubtful: 2.0,
            health_questionable: 1.5,
            health_probable: 0.5,
            agreement_points: 10.0,
            agreement_unknown: 5.0,
            injury_points_per_point: 3.0,
            injury_max: 10.0,
            consensus_full: 15.0,
            consensus_partial: 7.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub sample_games: f64,
    pub sample_points: f64,
    pub consistency_points: f64,
    pub cover_points: f64,
    pub cover_scale: f64,
    pub agreement_points: f64,
    pub agreement_scale: f64,
    pub high_threshold: f64,
    pub low_threshold: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            sample_games: 15.0,
            sample_points: 30.0,
            consistency_points: 25.0,
            cover_points: 25.0,
            cover_scale: 5.0,
            agreement_points: 20.0,
            agreement_scale: 10.0,
            high_threshold: 70.0,
            low_threshold: 45.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WagerConfig {
    pub spread_odds: i32,
    pub min_ev: f64,
    pub prefer_margin: f64,
    // Share of the moneyline win probability taken from the Elo expectation.
    pub elo_prob_weight: f64,
    pub kelly_fraction: f64,
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self {
            spread_odds: -110,
            min_ev: 2.0,
            prefer_margin: 3.0,
            elo_prob_weight: 0.5,
            kelly_fraction: 0.5,
        }
    }
}

/// Points added when facing an opponent whose roster changed by trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeAdjustment {
    pub opponent: String,
    pub points: f64,
    #[serde(default)]
    pub note: String,
}

/// Own-roster change whose effect runs out on `expires` (exclusive).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterTransition {
    pub label: String,
    pub points: f64,
    pub expires: NaiveDate,
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read model config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parse model config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("decode model config")
    }

    /// Loads the file named by `SPREAD_MODEL_CONFIG`, or the defaults when unset.
    pub fn from_env() -> Result<Self> {
        match config_path_from_env() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn trade_adjustment(&self, opponent: &str) -> Option<&TradeAdjustment> {
        let key = opponent.trim();
        self.trade_adjustments
            .iter()
            .find(|t| t.opponent.trim().eq_ignore_ascii_case(key))
    }

    pub fn active_transitions(&self, on: NaiveDate) -> impl Iterator<Item = &RosterTransition> {
        self.roster_transitions.iter().filter(move |t| on < t.expires)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
        .map(PathBuf::from)
}
