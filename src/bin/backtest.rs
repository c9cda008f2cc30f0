use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use hoops_spread::backtest::{BacktestReport, BacktestSettings, run_backtest};
use hoops_spread::calibration;
use hoops_spread::config::ModelConfig;
use hoops_spread::game_log;
use hoops_spread::model::SpreadEngine;
use hoops_spread::sample_log::{SampleSeason, synthetic_season};
use hoops_spread::types::PredictionMode;

const DEFAULT_MIN_HISTORY: usize = 5;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let config = match parse_path_arg("--config") {
        Some(path) => ModelConfig::load(&path)?,
        None => ModelConfig::from_env()?,
    };
    let engine = SpreadEngine::new(config);

    let games = match std::env::args().nth(1).filter(|a| !a.starts_with("--")) {
        Some(path) => game_log::load_game_log(&PathBuf::from(path))?,
        None => {
            let seed = parse_usize_arg("--seed").unwrap_or(7) as u64;
            println!("No game log given; using synthetic season (seed {seed})");
            synthetic_season(&SampleSeason {
                seed,
                games: parse_usize_arg("--games").unwrap_or(60),
                ..SampleSeason::default()
            })
        }
    };

    let modes = match parse_mode_arg()? {
        Some(mode) => vec![mode],
        None => PredictionMode::ALL.to_vec(),
    };

    for mode in modes {
        let settings = BacktestSettings {
            min_history: parse_usize_arg("--min-history").unwrap_or(DEFAULT_MIN_HISTORY),
            mode,
            ..BacktestSettings::default()
        };
        let report = run_backtest(&engine, &games, &settings)?;
        if has_flag("--json") {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_report(report: &BacktestReport) {
    let m = &report.metrics;
    println!();
    println!("Walk-forward backtest ({})", report.mode.as_str());
    println!(
        "samples={} mae={:.2} rmse={:.2} bias={:+.2} ats={:.3} ({} graded) brier={:.4} ece={:.4}",
        m.samples,
        m.mae,
        m.rmse,
        m.bias,
        m.ats_accuracy,
        m.ats_samples,
        m.brier,
        calibration::expected_calibration_error(&report.calibration),
    );
    println!(
        "components: elo mae={:.2} rmse={:.2} | net rating mae={:.2} rmse={:.2}",
        m.elo_mae, m.elo_rmse, m.net_rating_mae, m.net_rating_rmse
    );
    for b in &report.buckets {
        println!(
            "  {:<14} n={:<4} mae={:>5.2} pred={:>+6.2} actual={:>+6.2} ats={:.3} [{:.3}, {:.3}]{}",
            b.label,
            b.count,
            b.mae,
            b.avg_predicted,
            b.avg_actual,
            b.ats_rate,
            b.ci_lower,
            b.ci_upper,
            if b.sample_sufficient { "" } else { " (thin)" },
        );
    }
    for bias in &report.biases {
        println!(
            "  bias: {} {} by {:.1} pts (n={})",
            bias.bucket, bias.direction, bias.points, bias.count
        );
    }
    let fallbacks = report
        .rows
        .iter()
        .filter(|r| r.mode_used != report.mode)
        .count();
    if fallbacks > 0 {
        println!("  fell back to standard for {fallbacks} games");
    }
}

fn parse_mode_arg() -> Result<Option<PredictionMode>> {
    let Some(raw) = parse_str_arg("--mode") else {
        return Ok(None);
    };
    PredictionMode::ALL
        .into_iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(raw.trim()))
        .map(Some)
        .ok_or_else(|| anyhow!("unknown mode {raw:?}"))
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_str_arg(name)
        .filter(|v| !v.trim().is_empty())
        .map(|v| PathBuf::from(v.trim()))
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_str_arg(name).and_then(|v| v.trim().parse::<usize>().ok())
}

fn parse_str_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}=")) {
            return Some(raw.to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
        {
            return Some(next.clone());
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
