use chrono::Duration;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use hoops_spread::backtest::{BacktestSettings, run_backtest};
use hoops_spread::model::{LogSnapshot, SpreadEngine};
use hoops_spread::rolling::compute_rolling_metrics;
use hoops_spread::sample_log::{SampleSeason, synthetic_season};
use hoops_spread::types::{GameRecord, UpcomingGame};

fn full_season() -> Vec<GameRecord> {
    synthetic_season(&SampleSeason {
        games: 82,
        ..SampleSeason::default()
    })
}

fn slate(games: &[GameRecord], n: usize) -> Vec<UpcomingGame> {
    let last = games[0].date;
    (0..n)
        .map(|i| {
            let mut up = UpcomingGame::new(
                format!("bench-{i}"),
                last + Duration::days(1 + i as i64),
                "NYK",
                i % 2 == 0,
            );
            up.spread = Some(-3.5 + i as f64);
            up.moneyline = Some(if i % 2 == 0 { -160 } else { 135 });
            up.opponent_net_rating = Some(5.1);
            up.opponent_pace = Some(98.5);
            up
        })
        .collect()
}

fn bench_rolling(c: &mut Criterion) {
    let games = full_season();
    c.bench_function("rolling_metrics_last10", |b| {
        b.iter(|| compute_rolling_metrics(black_box(&games), 10, None, false))
    });
    c.bench_function("rolling_metrics_season_qualified", |b| {
        b.iter(|| compute_rolling_metrics(black_box(&games), games.len(), None, true))
    });
}

fn bench_predict(c: &mut Criterion) {
    let games = full_season();
    let engine = SpreadEngine::default();
    let snapshot = LogSnapshot::from_games(&games, None).expect("sorted synthetic log");
    let upcoming = slate(&games, 1).remove(0);

    c.bench_function("predict_all_modes", |b| {
        b.iter(|| engine.predict_all_modes(black_box(&snapshot.context(&upcoming, Some(&games)))))
    });

    let upcoming = slate(&games, 15);
    c.bench_function("predict_slate_15", |b| {
        b.iter(|| engine.predict_slate(black_box(&games), black_box(&upcoming), None))
    });
}

fn bench_backtest(c: &mut Criterion) {
    let games = full_season();
    let engine = SpreadEngine::default();
    let settings = BacktestSettings::default();
    c.bench_function("walk_forward_backtest_82", |b| {
        b.iter(|| run_backtest(&engine, black_box(&games), &settings))
    });
}

criterion_group!(benches, bench_rolling, bench_predict, bench_backtest);
criterion_main!(benches);
