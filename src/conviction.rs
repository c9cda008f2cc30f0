//! Sizing conviction, scored apart from the margin itself.
//!
//! Three capped buckets sum to a 0-100 total:
//! - chaos (0-30): pace calm plus a tail-risk haircut from excess sigma
//! - edge reliability (0-35): core-subset freshness, rest, key-player health
//! - signal alignment (0-35): Elo/net-rating agreement, opponent injury edge, mode consensus

use serde::{Deserialize, Serialize};

use crate::config::ConvictionConfig;
use crate::types::{InjuryReport, InjuryStatus};

pub const CHAOS_MAX: f64 = 30.0;
pub const EDGE_MAX: f64 = 35.0;
pub const ALIGNMENT_MAX: f64 = 35.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvictionInputs<'a> {
    pub combined_pace: f64,
    pub sigma: f64,
    pub base_sigma: f64,
    pub core_games: usize,
    pub days_since_core_game: Option<u32>,
    pub rest_days: u32,
    pub is_back_to_back: bool,
    pub injury_report: Option<&'a InjuryReport>,
    pub elo_spread: f64,
    pub net_rating_spread: f64,
    pub market_spread: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ChaosBucket {
    pub pace: f64,
    pub tail_haircut: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EdgeBucket {
    pub freshness: f64,
    pub rest: f64,
    pub health: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AlignmentBucket {
    pub component_agreement: f64,
    pub injury_edge: f64,
    pub mode_consensus: f64,
    pub score: f64,
}

impl AlignmentBucket {
    fn rescore(&mut self) {
        self.score = (self.component_agreement + self.injury_edge + self.mode_consensus)
            .clamp(0.0, ALIGNMENT_MAX);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Conviction {
    pub total: f64,
    pub chaos: ChaosBucket,
    pub edge: EdgeBucket,
    pub alignment: AlignmentBucket,
}

impl Conviction {
    fn retotal(&mut self) {
        self.total = (self.chaos.score + self.edge.score + self.alignment.score).clamp(0.0, 100.0);
    }

    /// Replace only the mode-consensus component. Recomputing with the same bonus is a no-op.
    pub fn with_mode_consensus(mut self, bonus: f64) -> Self {
        self.alignment.mode_consensus = bonus;
        self.alignment.rescore();
        self.retotal();
        self
    }
}

pub fn score_conviction(inputs: &ConvictionInputs<'_>, cfg: &ConvictionConfig) -> Conviction {
    let mut out = Conviction {
        total: 0.0,
        chaos: chaos_bucket(inputs, cfg),
        edge: edge_bucket(inputs, cfg),
        alignment: alignment_bucket(inputs, cfg),
    };
    out.retotal();
    out
}

fn chaos_bucket(inputs: &ConvictionInputs<'_>, cfg: &ConvictionConfig) -> ChaosBucket {
    let span = (cfg.frantic_pace - cfg.calm_pace).max(1.0);
    let calm = ((cfg.frantic_pace - inputs.combined_pace) / span).clamp(0.0, 1.0);
    let pace = cfg.pace_min + calm * (cfg.pace_max - cfg.pace_min);

    // Sigma reaches conviction only through this haircut.
    let excess = (inputs.sigma - inputs.base_sigma).max(0.0);
    let tail_haircut = -(excess * cfg.haircut_per_sigma).min(cfg.max_haircut);

    ChaosBucket {
        pace,
        tail_haircut,
        score: (pace + tail_haircut).clamp(0.0, CHAOS_MAX),
    }
}

fn edge_bucket(inputs: &ConvictionInputs<'_>, cfg: &ConvictionConfig) -> EdgeBucket {
    let freshness = if inputs.core_games == 0 {
        0.0
    } else {
        let days = inputs.days_since_core_game.unwrap_or(0) as f64;
        cfg.freshness_max * (-days / cfg.freshness_decay_days.max(1.0)).exp()
    };

    let rest = if inputs.is_back_to_back || inputs.rest_days == 0 {
        cfg.rest_back_to_back
    } else if inputs.rest_days == 1 {
        cfg.rest_one_day
    } else {
        cfg.rest_full
    };

    let health = match inputs.injury_report {
        None => cfg.health_max,
        Some(report) => {
            let hit = report.count_with(InjuryStatus::Out) as f64 * cfg.health_out
                + report.count_with(InjuryStatus::Doubtful) as f64 * cfg.health_doubtful
                + report.count_with(InjuryStatus::Questionable) as f64 * cfg.health_questionable
                + report.count_with(InjuryStatus::Probable) as f64 * cfg.health_probable;
            (cfg.health_max - hit).clamp(0.0, cfg.health_max)
        }
    };

    EdgeBucket {
        freshness,
        rest,
        health,
        score: (freshness + rest + health).clamp(0.0, EDGE_MAX),
    }
}

fn alignment_bucket(inputs: &ConvictionInputs<'_>, cfg: &ConvictionConfig) -> AlignmentBucket {
    let component_agreement = match inputs.market_spread {
        None => cfg.agreement_unknown,
        Some(spread) => {
            let elo_side = (inputs.elo_spread + spread).signum();
            let nr_side = (inputs.net_rating_spread + spread).signum();
            if elo_side == nr_side {
                cfg.agreement_points
            } else {
                0.0
            }
        }
    };

    let injury_edge = inputs
        .injury_report
        .map(|r| r.opponent_spread_adjustment.max(0.0) * cfg.injury_points_per_point)
        .unwrap_or(0.0)
        .min(cfg.injury_max);

    let mut out = AlignmentBucket {
        component_agreement,
        injury_edge,
        mode_consensus: 0.0,
        score: 0.0,
    };
    out.rescore();
    out
}

/// Bonus for how many of the three mode predictions land on the same cover side.
pub fn mode_consensus_bonus(agreeing: usize, cfg: &ConvictionConfig) -> f64 {
    match agreeing {
        n if n >= 3 => cfg.consensus_full,
        2 => cfg.consensus_partial,
        _ => 0.0,
    }
}
