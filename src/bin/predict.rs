use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, NaiveDate};
use tracing_subscriber::EnvFilter;

use hoops_spread::config::ModelConfig;
use hoops_spread::game_log;
use hoops_spread::model::{ModePredictions, SpreadEngine};
use hoops_spread::rolling::SpreadLookup;
use hoops_spread::sample_log::{SampleSeason, synthetic_season};
use hoops_spread::types::{GameRecord, UpcomingGame};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let config = match parse_path_arg("--config") {
        Some(path) => ModelConfig::load(&path)?,
        None => ModelConfig::from_env()?,
    };
    let engine = SpreadEngine::new(config);

    let (games, upcoming) = match (parse_path_arg("--log"), parse_path_arg("--upcoming")) {
        (Some(log), Some(up)) => (game_log::load_game_log(&log)?, game_log::load_upcoming(&up)?),
        (None, None) => demo_slate(),
        _ => return Err(anyhow!("--log and --upcoming must be given together")),
    };
    let spreads = parse_path_arg("--spreads")
        .map(|p| load_spreads(&p))
        .transpose()?;

    tracing::info!(games = games.len(), upcoming = upcoming.len(), "predicting slate");
    let predictions = engine.predict_slate(&games, &upcoming, spreads.as_ref())?;

    if has_flag("--table") {
        print_table(&predictions);
    } else {
        println!("{}", serde_json::to_string_pretty(&predictions)?);
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn demo_slate() -> (Vec<GameRecord>, Vec<UpcomingGame>) {
    let games = synthetic_season(&SampleSeason::default());
    let last = games.first().map(|g| g.date).unwrap_or(NaiveDate::MIN);

    let mut home = UpcomingGame::new("demo-1", last + Duration::days(2), "BOS", true);
    home.spread = Some(6.5);
    home.moneyline = Some(220);
    home.opponent_net_rating = Some(8.5);
    home.opponent_pace = Some(99.0);
    home.rest_days = 1;

    let mut road = UpcomingGame::new("demo-2", last + Duration::days(3), "WAS", false);
    road.spread = Some(-4.0);
    road.opponent_net_rating = Some(-9.7);
    road.rest_days = 0;
    road.is_back_to_back = true;

    (games, vec![home, road])
}

fn load_spreads(path: &Path) -> Result<SpreadLookup> {
    let raw = fs::read_to_string(path).with_context(|| format!("read spreads {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse spreads {}", path.display()))
}

fn print_table(predictions: &[ModePredictions]) {
    println!(
        "{:<10} {:<5} {:>8} {:>8} {:>8} {:>7} {:>6} {:<8} {:<16}",
        "game", "opp", "std", "buzz", "bayes", "cover", "conv", "conf", "regime"
    );
    for p in predictions {
        let b = &p.bayesian;
        println!(
            "{:<10} {:<5} {:>+8.1} {:>+8.1} {:>+8.1} {:>+7.1} {:>6.1} {:<8} {:<16}",
            b.game_id,
            b.opponent,
            p.standard.predicted_margin,
            p.buzzing.predicted_margin,
            b.predicted_margin,
            b.predicted_cover,
            b.conviction.total,
            format!("{:?}", b.confidence).to_lowercase(),
            b.regime,
        );
        if let Some(w) = &b.wager {
            println!(
                "{:>16} cover={:.3} win={:.3} spread_ev={:+.2} ml_ev={:+.2} pick={:?} stake={:.3}",
                "",
                w.cover_probability,
                w.win_probability,
                w.spread_ev,
                w.moneyline_ev,
                w.recommendation,
                w.stake
            );
        }
    }
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
        {
            return Some(PathBuf::from(next.trim()));
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
