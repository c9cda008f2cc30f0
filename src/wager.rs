use serde::{Deserialize, Serialize};

use crate::config::WagerConfig;
use crate::elo::expected_score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Spread,
    Moneyline,
    Pass,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WagerAnalysis {
    pub cover_probability: f64,
    pub win_probability: f64,
    pub moneyline_implied: f64,
    pub spread_implied: f64,
    /// Expected profit per 100 staked.
    pub spread_ev: f64,
    pub moneyline_ev: f64,
    pub spread_kelly: f64,
    pub moneyline_kelly: f64,
    /// Bankroll fraction for the recommended bet; zero on a pass.
    pub stake: f64,
    pub recommendation: BetType,
}

/// Cover and moneyline EV for one game. `None` unless both a spread and a moneyline exist.
pub fn analyze_wager(
    margin: f64,
    sigma: f64,
    spread: Option<f64>,
    moneyline: Option<i32>,
    elo_diff: f64,
    cfg: &WagerConfig,
) -> Option<WagerAnalysis> {
    let (spread, moneyline) = (spread?, moneyline?);
    let sigma = sigma.max(1e-6);

    let cover_probability = normal_cdf((margin + spread) / sigma);
    let margin_win = normal_cdf(margin / sigma);
    let elo_win = expected_score(elo_diff, 0.0);
    let w = cfg.elo_prob_weight.clamp(0.0, 1.0);
    let win_probability = (1.0 - w) * margin_win + w * elo_win;

    let spread_ev = expected_value(cover_probability, cfg.spread_odds);
    let moneyline_ev = expected_value(win_probability, moneyline);

    let recommendation = if spread_ev < cfg.min_ev && moneyline_ev < cfg.min_ev {
        BetType::Pass
    } else if moneyline_ev - spread_ev > cfg.prefer_margin {
        BetType::Moneyline
    } else {
        BetType::Spread
    };

    let spread_kelly = kelly_stake(cover_probability, cfg.spread_odds, cfg.kelly_fraction);
    let moneyline_kelly = kelly_stake(win_probability, moneyline, cfg.kelly_fraction);
    let stake = match recommendation {
        BetType::Spread => spread_kelly,
        BetType::Moneyline => moneyline_kelly,
        BetType::Pass => 0.0,
    };
    tracing::trace!(cover_probability, spread_ev, moneyline_ev, stake, ?recommendation, "wager analysis");

    Some(WagerAnalysis {
        cover_probability,
        win_probability,
        moneyline_implied: american_to_probability(moneyline),
        spread_implied: american_to_probability(cfg.spread_odds),
        spread_ev,
        moneyline_ev,
        spread_kelly,
        moneyline_kelly,
        stake,
        recommendation,
    })
}

pub fn american_to_probability(odds: i32) -> f64 {
    if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else {
        let abs = odds.unsigned_abs() as f64;
        abs / (abs + 100.0)
    }
}

/// Profit on a winning 100 stake at American odds.
pub fn american_payout(odds: i32) -> f64 {
    if odds > 0 {
        odds as f64
    } else {
        10_000.0 / (odds.unsigned_abs() as f64).max(1.0)
    }
}

pub fn expected_value(prob: f64, odds: i32) -> f64 {
    let p = prob.clamp(0.0, 1.0);
    p * american_payout(odds) - (1.0 - p) * 100.0
}

/// Scaled Kelly fraction of bankroll; zero without an edge.
pub fn kelly_stake(prob: f64, odds: i32, fraction: f64) -> f64 {
    let b = american_payout(odds) / 100.0;
    if b <= 0.0 {
        return 0.0;
    }
    let p = prob.clamp(0.0, 1.0);
    let full = (b * p - (1.0 - p)) / b;
    (full * fraction.clamp(0.0, 1.0)).max(0.0)
}

/// Standard normal CDF (Abramowitz and Stegun 7.1.26).
pub fn normal_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs() / std::f64::consts::SQRT_2;

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    0.5 * (1.0 + sign * y)
}
