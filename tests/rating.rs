use hoops_spread::config::{EloConfig, RatingConfig};
use hoops_spread::elo::{elo_spread, estimate_rating, expected_score};

#[test]
fn winning_record_lands_between_baseline_and_win_rate_rating() {
    let cfg = RatingConfig::default();
    let r = estimate_rating(10, 5, 60.0, 15, true, &cfg);
    assert!(r > 1500.0 && r < 1620.0, "rating {r}");
}

#[test]
fn no_games_is_baseline() {
    let cfg = RatingConfig::default();
    assert_eq!(estimate_rating(0, 0, 0.0, 0, true, &cfg), 1500.0);
}

#[test]
fn rating_stays_in_bounds_for_extreme_records() {
    let cfg = RatingConfig::default();
    let perfect = estimate_rating(3, 0, 150.0, 3, false, &cfg);
    let winless = estimate_rating(0, 3, -150.0, 3, false, &cfg);
    assert!(perfect > 1500.0 && perfect <= 1800.0 + 50.0 * cfg.points_per_diff);
    assert!(winless < 1500.0);

    // The cap limits the differential term to +/-20 points per game.
    let capped = estimate_rating(3, 0, 150.0, 3, true, &cfg);
    assert!(capped < perfect);
}

#[test]
fn elo_spread_is_symmetric_around_home_court() {
    let cfg = EloConfig::default();
    let home = elo_spread(1550.0, 1550.0, true, false, false, &cfg);
    let road = elo_spread(1550.0, 1550.0, false, false, false, &cfg);
    assert!((home - 2.5).abs() < 1e-9);
    assert!((home + road).abs() < 1e-9);
    assert!(elo_spread(1550.0, 1550.0, true, true, false, &cfg) < home);
    assert!((expected_score(1600.0, 1600.0) - 0.5).abs() < 1e-12);
}
