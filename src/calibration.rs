use serde::Serialize;

use crate::rolling::cover_outcome;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Forecast {
    pub predicted_margin: f64,
    pub actual_margin: f64,
    pub spread: Option<f64>,
    pub cover_probability: Option<f64>,
    pub elo_margin: Option<f64>,
    pub net_rating_margin: Option<f64>,
}

impl Forecast {
    pub fn abs_error(&self) -> f64 {
        (self.predicted_margin - self.actual_margin).abs()
    }

    /// Against a line, `Some(true)` when the predicted side matched the actual side.
    /// Pushes and missing lines are not graded.
    pub fn ats_hit(&self) -> Option<bool> {
        let spread = self.spread?;
        let covered = cover_outcome(self.actual_margin + spread)?;
        Some((self.predicted_margin + spread > 0.0) == covered)
    }

    pub fn covered(&self) -> Option<bool> {
        cover_outcome(self.actual_margin + self.spread?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Metrics {
    pub samples: usize,
    pub mae: f64,
    pub rmse: f64,
    pub bias: f64,
    pub ats_samples: usize,
    pub ats_accuracy: f64,
    pub brier: f64,
    pub elo_mae: f64,
    pub elo_rmse: f64,
    pub net_rating_mae: f64,
    pub net_rating_rmse: f64,
}

pub fn evaluate(forecasts: &[Forecast]) -> Metrics {
    if forecasts.is_empty() {
        return Metrics::default();
    }

    let n = forecasts.len() as f64;
    let mut abs_sum = 0.0_f64;
    let mut sq_sum = 0.0_f64;
    let mut bias_sum = 0.0_f64;
    let mut ats_n = 0usize;
    let mut ats_hits = 0usize;

    for f in forecasts {
        let err = f.predicted_margin - f.actual_margin;
        abs_sum += err.abs();
        sq_sum += err * err;
        bias_sum += err;
        if let Some(hit) = f.ats_hit() {
            ats_n += 1;
            if hit {
                ats_hits += 1;
            }
        }
    }

    let (probs, outcomes): (Vec<f64>, Vec<bool>) = forecasts
        .iter()
        .filter_map(|f| Some((f.cover_probability?, f.covered()?)))
        .unzip();
    let (elo_mae, elo_rmse) = component_errors(forecasts, |f| f.elo_margin);
    let (net_rating_mae, net_rating_rmse) = component_errors(forecasts, |f| f.net_rating_margin);

    Metrics {
        samples: forecasts.len(),
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        bias: bias_sum / n,
        ats_samples: ats_n,
        ats_accuracy: if ats_n > 0 {
            ats_hits as f64 / ats_n as f64
        } else {
            0.0
        },
        brier: brier_score(&probs, &outcomes),
        elo_mae,
        elo_rmse,
        net_rating_mae,
        net_rating_rmse,
    }
}

// MAE and RMSE of one signal family on its own, over the forecasts that carry it.
fn component_errors(forecasts: &[Forecast], pick: impl Fn(&Forecast) -> Option<f64>) -> (f64, f64) {
    let errors: Vec<f64> = forecasts
        .iter()
        .filter_map(|f| Some(pick(f)? - f.actual_margin))
        .collect();
    if errors.is_empty() {
        return (0.0, 0.0);
    }
    let n = errors.len() as f64;
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
    (mae, rmse)
}

/// Wilson score interval for a hit rate; `(0, 1)` with no trials.
pub fn wilson_interval(successes: u32, trials: u32, z: f64) -> (f64, f64) {
    if trials == 0 {
        return (0.0, 1.0);
    }
    let n = trials as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let half = (z / denom) * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();
    ((center - half).max(0.0), (center + half).min(1.0))
}

pub fn brier_score(probs: &[f64], outcomes: &[bool]) -> f64 {
    if probs.is_empty() || probs.len() != outcomes.len() {
        return 0.0;
    }
    let sum: f64 = probs
        .iter()
        .zip(outcomes)
        .map(|(p, y)| {
            let y = if *y { 1.0 } else { 0.0 };
            (p.clamp(0.0, 1.0) - y).powi(2)
        })
        .sum();
    sum / probs.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

pub fn calibration_bins(probs: &[f64], outcomes: &[bool], bins: usize) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for (p, hit) in probs.iter().zip(outcomes) {
        let p = p.clamp(0.0, 1.0);
        let idx = ((p * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += p;
        if *hit {
            actual_sum[idx] += 1.0;
        }
    }

    let mut out = Vec::with_capacity(bins);
    for i in 0..bins {
        let count = counts[i];
        let (avg_pred, actual_rate) = if count > 0 {
            (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
        } else {
            (0.0, 0.0)
        };
        out.push(CalibrationBin {
            bucket_start: i as f64 / bins as f64,
            bucket_end: (i + 1) as f64 / bins as f64,
            count,
            avg_pred,
            actual_rate,
        });
    }
    out
}

/// Count-weighted gap between predicted and realized rates.
pub fn expected_calibration_error(bins: &[CalibrationBin]) -> f64 {
    let total: usize = bins.iter().map(|b| b.count).sum();
    if total == 0 {
        return 0.0;
    }
    bins.iter()
        .map(|b| b.count as f64 * (b.avg_pred - b.actual_rate).abs())
        .sum::<f64>()
        / total as f64
}
