use chrono::{Duration, NaiveDate};

use hoops_spread::config::{ModelConfig, RosterTransition};
use hoops_spread::error::ModelError;
use hoops_spread::model::{
    LogSnapshot, PredictionContext, SpreadEngine, SpreadPrediction, apply_mode_consensus,
};
use hoops_spread::rolling::WindowSet;
use hoops_spread::sample_log::{SampleSeason, synthetic_season};
use hoops_spread::trend::TrendAnalysis;
use hoops_spread::types::{GameRecord, PredictionMode, UpcomingGame};
use hoops_spread::wager::BetType;

fn season() -> Vec<GameRecord> {
    synthetic_season(&SampleSeason::default())
}

fn next_game(games: &[GameRecord], id: &str, spread: Option<f64>, moneyline: Option<i32>) -> UpcomingGame {
    let last = games.first().map(|g| g.date).unwrap_or(NaiveDate::MIN);
    let mut up = UpcomingGame::new(id, last + Duration::days(2), "MIA", true);
    up.spread = spread;
    up.moneyline = moneyline;
    up.opponent_net_rating = Some(0.6);
    up.opponent_pace = Some(100.0);
    up
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[test]
fn predicted_cover_is_margin_plus_spread() {
    let games = season();
    let engine = SpreadEngine::default();
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();

    for spread in [-5.5, 0.0, 3.5, 9.0] {
        let up = next_game(&games, "cover", Some(spread), None);
        let p = engine
            .predict_margin(&snapshot.context(&up, Some(&games)), PredictionMode::Bayesian)
            .unwrap();
        assert_eq!(p.predicted_margin, round1(p.predicted_margin));
        assert!((p.predicted_cover - round1(p.predicted_margin + spread)).abs() < 1e-9);
    }
}

#[test]
fn no_spread_means_zero_cover_and_no_wager() {
    let games = season();
    let engine = SpreadEngine::default();
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let up = next_game(&games, "no-line", None, Some(-150));
    let p = engine
        .predict_margin(&snapshot.context(&up, Some(&games)), PredictionMode::Standard)
        .unwrap();
    assert_eq!(p.predicted_cover, 0.0);
    assert!(p.wager.is_none());
}

#[test]
fn partial_market_yields_no_wager() {
    let games = season();
    let engine = SpreadEngine::default();
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let up = next_game(&games, "spread-only", Some(-2.5), None);
    let p = engine
        .predict_margin(&snapshot.context(&up, Some(&games)), PredictionMode::Bayesian)
        .unwrap();
    assert!(p.wager.is_none());

    let full = next_game(&games, "full", Some(-2.5), Some(-140));
    let p = engine
        .predict_margin(&snapshot.context(&full, Some(&games)), PredictionMode::Bayesian)
        .unwrap();
    let wager = p.wager.unwrap();
    assert!((0.0..=1.0).contains(&wager.cover_probability));
    assert!(matches!(
        wager.recommendation,
        BetType::Spread | BetType::Moneyline | BetType::Pass
    ));
}

#[test]
fn bayesian_lies_between_standard_and_buzzing() {
    let games = season();
    let engine = SpreadEngine::default();
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let up = next_game(&games, "blend", Some(-1.5), None);
    let ctx = snapshot.context(&up, Some(&games));

    let standard = engine.predict_margin(&ctx, PredictionMode::Standard).unwrap();
    let buzzing = engine.predict_margin(&ctx, PredictionMode::Buzzing).unwrap();
    let bayesian = engine.predict_margin(&ctx, PredictionMode::Bayesian).unwrap();

    assert_eq!(buzzing.mode_used, PredictionMode::Buzzing);
    assert_eq!(bayesian.mode_used, PredictionMode::Bayesian);
    let lo = standard.raw_margin.min(buzzing.raw_margin) - 1e-9;
    let hi = standard.raw_margin.max(buzzing.raw_margin) + 1e-9;
    assert!(bayesian.raw_margin >= lo && bayesian.raw_margin <= hi);
    assert!(bayesian.core_weight > 0.0 && bayesian.core_weight < 1.0);
}

#[test]
fn bayesian_without_core_games_falls_back_to_standard() {
    let mut games = season();
    for g in &mut games {
        g.qualified = false;
    }
    let engine = SpreadEngine::default();
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let up = next_game(&games, "fallback", Some(-3.0), None);
    let ctx = snapshot.context(&up, Some(&games));

    let standard = engine.predict_margin(&ctx, PredictionMode::Standard).unwrap();
    let bayesian = engine.predict_margin(&ctx, PredictionMode::Bayesian).unwrap();
    assert_eq!(bayesian.mode, PredictionMode::Bayesian);
    assert_eq!(bayesian.mode_used, PredictionMode::Standard);
    assert_eq!(bayesian.raw_margin, standard.raw_margin);
}

#[test]
fn buzzing_without_any_game_log_is_an_error() {
    let up = UpcomingGame::new("x", NaiveDate::MIN, "BOS", true);
    let windows = WindowSet::default();
    let trend = TrendAnalysis::default();
    let ctx = PredictionContext {
        upcoming: &up,
        windows: &windows,
        trend: &trend,
        core_windows: None,
        season: None,
        games: None,
    };
    let engine = SpreadEngine::default();
    assert_eq!(
        engine.predict_margin(&ctx, PredictionMode::Buzzing),
        Err(ModelError::MissingGameLog)
    );
    assert!(engine.predict_margin(&ctx, PredictionMode::Standard).is_ok());
}

#[test]
fn display_margin_is_capped() {
    let mut games = season();
    for g in &mut games {
        g.net_rating = 40.0;
        g.team_score = g.opponent_score + 35;
        g.result = hoops_spread::types::GameResult::Win;
    }
    let engine = SpreadEngine::default();
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let mut up = next_game(&games, "rout", Some(-20.0), None);
    up.opponent_net_rating = Some(-12.0);
    let p = engine
        .predict_margin(&snapshot.context(&up, Some(&games)), PredictionMode::Standard)
        .unwrap();
    assert!(p.raw_margin > 15.0);
    assert_eq!(p.predicted_margin, 15.0);
}

#[test]
fn conviction_stays_in_range_and_consensus_is_idempotent() {
    let games = season();
    let engine = SpreadEngine::default();
    let upcoming = [
        next_game(&games, "a", Some(-4.0), Some(-170)),
        next_game(&games, "b", Some(7.5), Some(260)),
        next_game(&games, "c", None, None),
    ];
    let slate = engine.predict_slate(&games, &upcoming, None).unwrap();
    assert_eq!(slate.len(), 3);

    for (modes, up) in slate.iter().zip(&upcoming) {
        assert_eq!(modes.bayesian.game_id, up.id);
        for p in [&modes.standard, &modes.buzzing, &modes.bayesian] {
            assert!((0.0..=100.0).contains(&p.conviction.total));
        }

        let all = [&modes.standard, &modes.buzzing, &modes.bayesian];
        let again = apply_mode_consensus(&modes.bayesian, all, up.spread);
        assert_eq!(again, modes.bayesian);
        assert_eq!(again.predicted_margin, modes.bayesian.predicted_margin);
    }
}

#[test]
fn unsorted_log_is_rejected() {
    let mut games = season();
    games.swap(0, 5);
    let engine = SpreadEngine::new(ModelConfig::default());
    let up = next_game(&games, "z", Some(-1.0), None);
    assert!(matches!(
        engine.predict_slate(&games, &[up], None),
        Err(ModelError::UnsortedGameLog { .. })
    ));
}

#[test]
fn trade_table_moves_the_margin() {
    let games = season();
    let base = SpreadEngine::default();
    let mut config = ModelConfig::default();
    config.trade_adjustments = serde_json::from_str(
        r#"[{"opponent": "mia", "points": -4.0, "note": "deadline deal"}]"#,
    )
    .unwrap();
    let traded = SpreadEngine::new(config);

    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let up = next_game(&games, "t", Some(-2.0), None);
    let ctx = snapshot.context(&up, Some(&games));
    let a = base.predict_margin(&ctx, PredictionMode::Standard).unwrap();
    let b = traded.predict_margin(&ctx, PredictionMode::Standard).unwrap();
    assert!((a.raw_margin - b.raw_margin - 4.0 * 0.45).abs() < 1e-9);
    assert!(b.factors.iter().any(|f| f.name == "Trade: deadline deal"));
}

fn factor_impact(p: &SpreadPrediction, name: &str) -> Option<f64> {
    p.factors.iter().find(|f| f.name == name).map(|f| f.impact)
}

fn standard(engine: &SpreadEngine, ctx: &PredictionContext<'_>) -> SpreadPrediction {
    engine.predict_margin(ctx, PredictionMode::Standard).unwrap()
}

#[test]
fn momentum_enters_the_net_rating_side() {
    let games = season();
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let up = next_game(&games, "m", Some(-2.0), None);
    let trend = TrendAnalysis {
        momentum: 2.4,
        ..snapshot.trend
    };
    let mut ctx = snapshot.context(&up, Some(&games));
    ctx.trend = &trend;

    let base = standard(&SpreadEngine::default(), &ctx);
    assert_eq!(factor_impact(&base, "Momentum"), None);

    let mut config = ModelConfig::default();
    config.adjustments.momentum_weight = 1.0;
    let weighted = standard(&SpreadEngine::new(config), &ctx);
    let impact = factor_impact(&weighted, "Momentum").unwrap();
    assert!((impact - 0.45 * 2.4).abs() < 1e-9);
    assert!((weighted.raw_margin - base.raw_margin - 0.45 * 2.4).abs() < 1e-9);
}

#[test]
fn roster_transition_applies_until_it_expires() {
    let games = season();
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let up = next_game(&games, "r", Some(-2.0), None);
    let ctx = snapshot.context(&up, Some(&games));
    let base = standard(&SpreadEngine::default(), &ctx);

    let with_transition = |expires| {
        let mut config = ModelConfig::default();
        config.roster_transitions = vec![RosterTransition {
            label: "Star out".to_string(),
            points: -2.0,
            expires,
        }];
        standard(&SpreadEngine::new(config), &ctx)
    };

    let active = with_transition(up.date + Duration::days(1));
    let impact = factor_impact(&active, "Roster transition: Star out").unwrap();
    assert!((impact + 0.9).abs() < 1e-9);
    assert!((active.raw_margin - base.raw_margin + 0.9).abs() < 1e-9);

    let expired = with_transition(up.date);
    assert_eq!(factor_impact(&expired, "Roster transition: Star out"), None);
    assert_eq!(expired.raw_margin, base.raw_margin);
}

#[test]
fn mid_tier_correction_needs_flat_form() {
    let flat_form = |rating: f64| {
        let mut games = season();
        for g in &mut games {
            g.net_rating = rating;
        }
        games
    };
    let mut no_correction = ModelConfig::default();
    no_correction.adjustments.mid_tier_correction = 0.0;
    let corrected = SpreadEngine::default();
    let uncorrected = SpreadEngine::new(no_correction);

    let games = flat_form(1.0);
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    // 0.6 sits in the mid tier.
    let up = next_game(&games, "mid", Some(-1.0), None);
    let ctx = snapshot.context(&up, Some(&games));
    let a = standard(&corrected, &ctx);
    let b = standard(&uncorrected, &ctx);
    let impact = factor_impact(&a, "Mid-tier correction").unwrap();
    assert!((impact + 0.45 * 1.5).abs() < 1e-9);
    assert!((b.raw_margin - a.raw_margin - 0.675).abs() < 1e-9);

    let games = flat_form(5.0);
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let up = next_game(&games, "mid-hot", Some(-1.0), None);
    let p = standard(&corrected, &snapshot.context(&up, Some(&games)));
    assert_eq!(factor_impact(&p, "Mid-tier correction"), None);
}

#[test]
fn rest_differential_is_capped_at_two_days() {
    let games = season();
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let engine = SpreadEngine::default();

    let mut up = next_game(&games, "rest", Some(-2.0), None);
    up.rest_days = 1;
    let even = standard(&engine, &snapshot.context(&up, Some(&games)));
    assert_eq!(factor_impact(&even, "Rest differential"), None);

    up.opponent_rest_days = Some(4);
    let tired = standard(&engine, &snapshot.context(&up, Some(&games)));
    // Three days short, capped at two, half a point per day.
    let impact = factor_impact(&tired, "Rest differential").unwrap();
    assert!((impact + 0.45).abs() < 1e-9);
    assert!((tired.raw_margin - even.raw_margin + 0.45).abs() < 1e-9);

    up.opponent_rest_days = Some(1);
    let same = standard(&engine, &snapshot.context(&up, Some(&games)));
    assert_eq!(same.raw_margin, even.raw_margin);
}

#[test]
fn elite_opponent_penalty_starts_at_the_cutoff() {
    let games = season();
    let snapshot = LogSnapshot::from_games(&games, None).unwrap();
    let mut no_penalty = ModelConfig::default();
    no_penalty.adjustments.elite_penalty = 0.0;
    let penalized = SpreadEngine::default();
    let unpenalized = SpreadEngine::new(no_penalty);

    let mut up = next_game(&games, "elite", Some(6.5), None);
    up.opponent_net_rating = Some(8.0);
    let ctx = snapshot.context(&up, Some(&games));
    let a = standard(&penalized, &ctx);
    let b = standard(&unpenalized, &ctx);
    let impact = factor_impact(&a, "Elite opponent").unwrap();
    assert!((impact + 0.9).abs() < 1e-9);
    assert!((b.raw_margin - a.raw_margin - 0.9).abs() < 1e-9);

    up.opponent_net_rating = Some(5.9);
    let strong = standard(&penalized, &snapshot.context(&up, Some(&games)));
    assert_eq!(factor_impact(&strong, "Elite opponent"), None);

    let mut lowered = ModelConfig::default();
    lowered.tiers.elite = 5.0;
    let p = standard(&SpreadEngine::new(lowered), &snapshot.context(&up, Some(&games)));
    assert!(factor_impact(&p, "Elite opponent").is_some());
}
