use serde::{Deserialize, Serialize};

use crate::config::{TierConfig, VarianceConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeInputs {
    /// The prediction leans mostly on core-subset games.
    pub core_driven: bool,
    pub combined_pace: f64,
    pub opponent_net_rating: f64,
    pub days_since_core_game: Option<u32>,
    pub predicted_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceRegime {
    pub sigma: f64,
    pub label: String,
}

/// Independent volatility sources add in quadrature on top of the base sigma.
pub fn calculate_variance(
    inputs: &RegimeInputs,
    cfg: &VarianceConfig,
    tiers: &TierConfig,
) -> VarianceRegime {
    let mut boosts: Vec<f64> = Vec::new();
    let mut labels: Vec<&str> = Vec::new();

    if inputs.core_driven {
        boosts.push(cfg.core_boost);
        labels.push("Core5");
    }
    if inputs.combined_pace > cfg.high_pace_threshold {
        boosts.push(cfg.high_pace_boost);
        labels.push("HighPace");
    }
    if inputs.opponent_net_rating >= tiers.elite {
        boosts.push(cfg.elite_boost);
        labels.push("Elite");
    }
    if let Some(days) = inputs.days_since_core_game {
        let window = cfg.echo_window_days.max(1.0);
        let remaining = 1.0 - days as f64 / window;
        if remaining > 0.0 {
            boosts.push(cfg.echo_boost * remaining);
            labels.push("Echo");
        }
    }

    let margin_term = cfg.margin_coefficient * inputs.predicted_margin.abs();
    if inputs.predicted_margin.abs() >= cfg.blowout_label_margin {
        labels.push("Blowout");
    }

    let sum_sq = cfg.base_sigma.powi(2)
        + boosts.iter().map(|b| b.powi(2)).sum::<f64>()
        + margin_term.powi(2);
    let sigma = sum_sq.sqrt().max(cfg.base_sigma);

    let label = if labels.is_empty() {
        "Normal".to_string()
    } else {
        labels.join("+")
    };
    VarianceRegime { sigma, label }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm() -> RegimeInputs {
        RegimeInputs {
            core_driven: false,
            combined_pace: 198.0,
            opponent_net_rating: 0.0,
            days_since_core_game: None,
            predicted_margin: 0.0,
        }
    }

    #[test]
    fn calm_game_is_base_sigma() {
        let cfg = VarianceConfig::default();
        let r = calculate_variance(&calm(), &cfg, &TierConfig::default());
        assert_eq!(r.sigma, cfg.base_sigma);
        assert_eq!(r.label, "Normal");
    }

    #[test]
    fn boosts_add_in_quadrature() {
        let cfg = VarianceConfig::default();
        let mut inputs = calm();
        inputs.core_driven = true;
        inputs.combined_pace = 205.0;
        let r = calculate_variance(&inputs, &cfg, &TierConfig::default());
        let expected = (12.0_f64.powi(2) + 4.0_f64.powi(2) + 3.0_f64.powi(2)).sqrt();
        assert!((r.sigma - expected).abs() < 1e-12);
        assert!(r.sigma < 12.0 + 4.0 + 3.0);
        assert_eq!(r.label, "Core5+HighPace");
    }

    #[test]
    fn echo_fades_out_over_window() {
        let cfg = VarianceConfig::default();
        let mut inputs = calm();
        inputs.days_since_core_game = Some(5);
        let fresh = calculate_variance(&inputs, &cfg, &TierConfig::default());
        inputs.days_since_core_game = Some(45);
        let stale = calculate_variance(&inputs, &cfg, &TierConfig::default());
        inputs.days_since_core_game = Some(60);
        let gone = calculate_variance(&inputs, &cfg, &TierConfig::default());
        assert!(fresh.sigma > stale.sigma);
        assert!(stale.sigma > gone.sigma);
        assert_eq!(gone.label, "Normal");
        assert_eq!(fresh.label, "Echo");
    }

    #[test]
    fn bigger_margins_widen_sigma() {
        let cfg = VarianceConfig::default();
        let mut inputs = calm();
        inputs.predicted_margin = -12.0;
        let r = calculate_variance(&inputs, &cfg, &TierConfig::default());
        assert!((r.sigma - (144.0_f64 + 2.4_f64.powi(2)).sqrt()).abs() < 1e-9);
        assert_eq!(r.label, "Blowout");
    }

    #[test]
    fn sigma_never_drops_as_flags_turn_on() {
        let cfg = VarianceConfig::default();
        let mut inputs = calm();
        inputs.predicted_margin = 6.0;
        let mut last = calculate_variance(&inputs, &cfg, &TierConfig::default()).sigma;
        inputs.core_driven = true;
        let s = calculate_variance(&inputs, &cfg, &TierConfig::default()).sigma;
        assert!(s >= last);
        last = s;
        inputs.combined_pace = 210.0;
        let s = calculate_variance(&inputs, &cfg, &TierConfig::default()).sigma;
        assert!(s >= last);
        last = s;
        inputs.opponent_net_rating = 8.0;
        let s = calculate_variance(&inputs, &cfg, &TierConfig::default()).sigma;
        assert!(s >= last);
        last = s;
        inputs.days_since_core_game = Some(1);
        let s = calculate_variance(&inputs, &cfg, &TierConfig::default()).sigma;
        assert!(s >= last);
        assert!(s >= cfg.base_sigma);
    }
}
