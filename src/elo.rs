use crate::config::{EloConfig, RatingConfig};
use crate::types::SeasonRecord;

/// Elo-equivalent strength from a record and point differential.
///
/// Blends a win-rate rating with a point-differential rating. Early in a season the
/// win rate carries most of the weight; as games accumulate the weight slides toward
/// point differential, which never drops below `min_diff_weight`.
pub fn estimate_rating(
    wins: u32,
    losses: u32,
    point_diff: f64,
    games_played: u32,
    cap_point_diff: bool,
    cfg: &RatingConfig,
) -> f64 {
    if games_played == 0 {
        return cfg.baseline;
    }
    let n = games_played as f64;
    let decided = wins + losses;
    let from_win_pct = if decided == 0 {
        cfg.baseline
    } else {
        win_pct_rating(wins as f64 / decided as f64, cfg)
    };

    let mut avg_diff = point_diff / n;
    if cap_point_diff {
        avg_diff = avg_diff.clamp(-cfg.diff_cap, cfg.diff_cap);
    }
    let from_diff = cfg.baseline + avg_diff * cfg.points_per_diff;

    let w = win_pct_weight(n, cfg);
    w * from_win_pct + (1.0 - w) * from_diff
}

pub fn rating_for_record(record: &SeasonRecord, cap_point_diff: bool, cfg: &RatingConfig) -> f64 {
    estimate_rating(
        record.wins,
        record.losses,
        record.point_diff,
        record.games_played(),
        cap_point_diff,
        cfg,
    )
}

/// Opponent strength when only a net rating is known: net rating stands in for the
/// per-game differential.
pub fn rating_from_net_rating(net_rating: f64, cfg: &RatingConfig) -> f64 {
    cfg.baseline + net_rating.clamp(-cfg.diff_cap, cfg.diff_cap) * cfg.points_per_diff
}

fn win_pct_rating(win_pct: f64, cfg: &RatingConfig) -> f64 {
    if win_pct <= 0.0 {
        return cfg.floor;
    }
    if win_pct >= 1.0 {
        return cfg.ceiling;
    }
    let r = cfg.win_pct_intercept - cfg.win_pct_scale * ((1.0 / win_pct) - 1.0).log10();
    r.clamp(cfg.floor, cfg.ceiling)
}

fn win_pct_weight(games: f64, cfg: &RatingConfig) -> f64 {
    let horizon = cfg.win_weight_horizon_games.max(1.0);
    let floor = (1.0 - cfg.min_diff_weight).clamp(0.0, 1.0);
    (1.0 - games / horizon).max(floor)
}

/// Elo edge converted to points. Positive favours the team.
pub fn elo_spread(
    own_rating: f64,
    opponent_rating: f64,
    is_home: bool,
    own_fatigued: bool,
    opponent_fatigued: bool,
    cfg: &EloConfig,
) -> f64 {
    let mut diff = own_rating - opponent_rating;
    diff += if is_home {
        cfg.home_adv_pts
    } else {
        -cfg.home_adv_pts
    };
    if own_fatigued {
        diff -= cfg.fatigue_pts;
    }
    if opponent_fatigued {
        diff += cfg.fatigue_pts;
    }
    diff / cfg.pts_per_spread_point.max(1.0)
}

pub fn expected_score(r_a: f64, r_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf(-(r_a - r_b) / 400.0))
}
