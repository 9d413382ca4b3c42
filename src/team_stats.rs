use serde::{Deserialize, Serialize};

// League-average fallbacks used whenever a team has no recorded value.
// All default resolution happens at the store boundary (see `store`), so the
// engine itself always works with fully populated records.
pub const LEAGUE_AVG_PPG: f64 = 21.0;
pub const LEAGUE_AVG_CONSISTENCY: f64 = 50.0;
pub const LEAGUE_AVG_TOTAL_POINTS: f64 = 43.0;
pub const LEAGUE_SCORING_STD_DEV: f64 = 10.0;
pub const LEAGUE_AVG_YARDS_PER_PLAY: f64 = 5.5;
pub const DEFAULT_HOME_FIELD_ADVANTAGE: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameProfile {
    FastStarter,
    Closer,
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

/// A detected shift in a team's scoring trend: the recent window differs from
/// the one before it by at least the detection threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Changepoint {
    pub direction: TrendDirection,
    pub magnitude: f64,
}

/// Season snapshot for one team. Immutable once fetched; every numeric field
/// is concrete because defaults were applied when the record was built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamStats {
    pub team_code: String,
    pub season: i32,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub ppg_scored: f64,
    pub ppg_allowed: f64,
    pub last_5_ppg: f64,
    pub last_5_ppg_allowed: f64,
    pub scoring_std_dev: f64,
    pub ema_differential: f64,
    pub changepoint: Option<Changepoint>,
    pub scoring_consistency: f64,
    pub game_profile: GameProfile,
    pub avg_total_points: f64,
}

impl TeamStats {
    /// Placeholder record for a team with no stats on file. Keeps matchup
    /// computations alive instead of failing the whole slate.
    pub fn league_average(team_code: &str, season: i32) -> Self {
        Self {
            team_code: team_code.to_string(),
            season,
            games_played: 0,
            wins: 0,
            losses: 0,
            ties: 0,
            ppg_scored: LEAGUE_AVG_PPG,
            ppg_allowed: LEAGUE_AVG_PPG,
            last_5_ppg: LEAGUE_AVG_PPG,
            last_5_ppg_allowed: LEAGUE_AVG_PPG,
            scoring_std_dev: LEAGUE_SCORING_STD_DEV,
            ema_differential: 0.0,
            changepoint: None,
            scoring_consistency: LEAGUE_AVG_CONSISTENCY,
            game_profile: GameProfile::Balanced,
            avg_total_points: LEAGUE_AVG_TOTAL_POINTS,
        }
    }

    pub fn season_differential(&self) -> f64 {
        self.ppg_scored - self.ppg_allowed
    }

    pub fn recent_differential(&self) -> f64 {
        self.last_5_ppg - self.last_5_ppg_allowed
    }
}

/// Refined per-team metrics from the advanced-stats feed. When present for a
/// team, `srs` supersedes the PPG-differential power rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedStats {
    pub team_code: String,
    #[serde(default)]
    pub season: Option<i32>,
    /// Schedule-adjusted point-differential rating.
    pub srs: f64,
    #[serde(default)]
    pub sos: Option<f64>,
    #[serde(default)]
    pub win_pct: Option<f64>,
    #[serde(default)]
    pub ppd: Option<f64>,
    #[serde(default)]
    pub yards_per_play: Option<f64>,
    #[serde(default)]
    pub turnover_diff: Option<f64>,
    /// Team-specific home-field advantage in points.
    #[serde(default)]
    pub hfa: Option<f64>,
}

/// Scheduled matchup as stored externally. Read-only for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub season: i32,
    pub week: u32,
    pub game_date: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub home_first_half: Option<i32>,
    pub home_second_half: Option<i32>,
    pub away_first_half: Option<i32>,
    pub away_second_half: Option<i32>,
    pub is_completed: bool,
}

impl Game {
    /// Final margin from the home side's perspective, when both scores exist.
    pub fn home_margin(&self) -> Option<i32> {
        match (self.home_score, self.away_score) {
            (Some(h), Some(a)) => Some(h - a),
            _ => None,
        }
    }

    pub fn total_points(&self) -> Option<i32> {
        match (self.home_score, self.away_score) {
            (Some(h), Some(a)) => Some(h + a),
            _ => None,
        }
    }
}
