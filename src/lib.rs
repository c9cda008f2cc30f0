pub mod backtest;
pub mod calibration;
pub mod config;
pub mod conviction;
pub mod elo;
pub mod error;
pub mod game_log;
pub mod model;
pub mod rolling;
pub mod sample_log;
pub mod trend;
pub mod types;
pub mod variance;
pub mod wager;

pub use config::{DEFAULT_CONFIG, ModelConfig};
pub use error::ModelError;
pub use model::{
    LogSnapshot, ModePredictions, PredictionContext, SpreadEngine, SpreadPrediction,
    apply_mode_consensus, predict_margin,
};
pub use rolling::{RollingMetrics, WindowSet, compute_rolling_metrics};
pub use trend::{TrendAnalysis, analyze_trend};
pub use types::{GameRecord, PredictionMode, SeasonRecord, UpcomingGame};
