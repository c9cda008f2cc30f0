use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::TierConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    #[serde(rename = "W", alias = "win", alias = "Win")]
    Win,
    #[serde(rename = "L", alias = "loss", alias = "Loss")]
    Loss,
}

/// One completed game from the team's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    #[serde(alias = "gameId")]
    pub id: String,
    pub date: NaiveDate,
    pub opponent: String,
    pub is_home: bool,
    pub result: GameResult,
    #[serde(alias = "hornetsScore")]
    pub team_score: u32,
    pub opponent_score: u32,
    // All core players available.
    #[serde(rename = "isQualified", default)]
    pub qualified: bool,
    #[serde(default)]
    pub offensive_rating: f64,
    #[serde(default)]
    pub defensive_rating: f64,
    #[serde(default)]
    pub net_rating: f64,
    #[serde(default)]
    pub pace: f64,
    #[serde(default)]
    pub efg_pct: f64,
    #[serde(default)]
    pub ts_pct: f64,
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default)]
    pub moneyline: Option<i32>,
    #[serde(default)]
    pub implied_win_prob: Option<f64>,
    #[serde(default, alias = "coveredSpread")]
    pub covered: Option<bool>,
    #[serde(default)]
    pub opponent_net_rating: Option<f64>,
    #[serde(default)]
    pub opponent_pace: Option<f64>,
    #[serde(default = "default_rest_days")]
    pub rest_days: u32,
    #[serde(default)]
    pub is_back_to_back: bool,
}

impl GameRecord {
    pub fn point_margin(&self) -> f64 {
        self.team_score as f64 - self.opponent_score as f64
    }

    pub fn is_win(&self) -> bool {
        self.result == GameResult::Win
    }
}

fn default_rest_days() -> u32 {
    1
}

/// A scheduled game. Market fields stay `None` until a line is posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingGame {
    #[serde(alias = "gameId")]
    pub id: String,
    pub date: NaiveDate,
    pub opponent: String,
    pub is_home: bool,
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default)]
    pub moneyline: Option<i32>,
    #[serde(default)]
    pub implied_win_prob: Option<f64>,
    #[serde(default)]
    pub opponent_net_rating: Option<f64>,
    #[serde(default)]
    pub opponent_pace: Option<f64>,
    #[serde(default)]
    pub opponent_record: Option<SeasonRecord>,
    #[serde(default = "default_rest_days")]
    pub rest_days: u32,
    #[serde(default)]
    pub is_back_to_back: bool,
    #[serde(default)]
    pub opponent_rest_days: Option<u32>,
    #[serde(default)]
    pub opponent_back_to_back: bool,
    #[serde(default)]
    pub injury_report: Option<InjuryReport>,
}

impl UpcomingGame {
    pub fn new(id: impl Into<String>, date: NaiveDate, opponent: impl Into<String>, is_home: bool) -> Self {
        Self {
            id: id.into(),
            date,
            opponent: opponent.into(),
            is_home,
            spread: None,
            moneyline: None,
            implied_win_prob: None,
            opponent_net_rating: None,
            opponent_pace: None,
            opponent_record: None,
            rest_days: default_rest_days(),
            is_back_to_back: false,
            opponent_rest_days: None,
            opponent_back_to_back: false,
            injury_report: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRecord {
    pub wins: u32,
    pub losses: u32,
    pub point_diff: f64,
}

impl SeasonRecord {
    pub fn new(wins: u32, losses: u32, point_diff: f64) -> Self {
        Self {
            wins,
            losses,
            point_diff,
        }
    }

    pub fn games_played(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn from_games<'a>(games: impl IntoIterator<Item = &'a GameRecord>) -> Self {
        let mut out = Self::default();
        for g in games {
            if g.is_win() {
                out.wins += 1;
            } else {
                out.losses += 1;
            }
            out.point_diff += g.point_margin();
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjuryStatus {
    Available,
    Probable,
    Questionable,
    Doubtful,
    Out,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub name: String,
    pub status: InjuryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InjuryReport {
    #[serde(default)]
    pub key_players: Vec<PlayerStatus>,
    /// Points the opponent's own absences are worth against the market line.
    /// Positive favours this team.
    #[serde(default)]
    pub opponent_spread_adjustment: f64,
}

impl InjuryReport {
    pub fn count_with(&self, status: InjuryStatus) -> usize {
        self.key_players.iter().filter(|p| p.status == status).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PredictionMode {
    Standard,
    Buzzing,
    #[default]
    Bayesian,
}

impl PredictionMode {
    pub const ALL: [PredictionMode; 3] = [
        PredictionMode::Standard,
        PredictionMode::Buzzing,
        PredictionMode::Bayesian,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionMode::Standard => "standard",
            PredictionMode::Buzzing => "buzzing",
            PredictionMode::Bayesian => "bayesian",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpponentTier {
    Elite,
    Strong,
    Mid,
    Weak,
}

impl OpponentTier {
    pub const ALL: [OpponentTier; 4] = [
        OpponentTier::Elite,
        OpponentTier::Strong,
        OpponentTier::Mid,
        OpponentTier::Weak,
    ];

    pub fn classify(net_rating: f64, cutoffs: &TierConfig) -> Self {
        if net_rating >= cutoffs.elite {
            OpponentTier::Elite
        } else if net_rating >= cutoffs.strong {
            OpponentTier::Strong
        } else if net_rating >= cutoffs.mid {
            OpponentTier::Mid
        } else {
            OpponentTier::Weak
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OpponentTier::Elite => "elite",
            OpponentTier::Strong => "strong",
            OpponentTier::Mid => "mid",
            OpponentTier::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_net_rating_thresholds() {
        let cutoffs = TierConfig::default();
        assert_eq!(OpponentTier::classify(6.0, &cutoffs), OpponentTier::Elite);
        assert_eq!(OpponentTier::classify(5.9, &cutoffs), OpponentTier::Strong);
        assert_eq!(OpponentTier::classify(-3.0, &cutoffs), OpponentTier::Mid);
        assert_eq!(OpponentTier::classify(-3.1, &cutoffs), OpponentTier::Weak);

        let strict = TierConfig {
            elite: 8.0,
            ..TierConfig::default()
        };
        assert_eq!(OpponentTier::classify(7.0, &strict), OpponentTier::Strong);
    }

    #[test]
    fn season_record_sums_margins() {
        let games = [
            GameRecord {
                id: "a".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 11, 2).unwrap(),
                opponent: "BOS".to_string(),
                is_home: true,
                result: GameResult::Win,
                team_score: 110,
                opponent_score: 100,
                qualified: true,
                offensive_rating: 0.0,
                defensive_rating: 0.0,
                net_rating: 0.0,
                pace: 0.0,
                efg_pct: 0.0,
                ts_pct: 0.0,
                spread: None,
                moneyline: None,
                implied_win_prob: None,
                covered: None,
                opponent_net_rating: None,
                opponent_pace: None,
                rest_days: 1,
                is_back_to_back: false,
            },
        ];
        let rec = SeasonRecord::from_games(&games);
        assert_eq!(rec.wins, 1);
        assert_eq!(rec.games_played(), 1);
        assert_eq!(rec.point_diff, 10.0);
    }
}
