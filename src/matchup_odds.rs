use serde::Serialize;

use crate::odds_math::saturating_american_odds;
use crate::power_rating::power_rating;
use crate::team_stats::{AdvancedStats, DEFAULT_HOME_FIELD_ADVANTAGE, TeamStats};

// Calibration constant of the logistic link: a 10-15 point rating gap maps
// to win probabilities in the 0.7-0.9 range.
const LOGISTIC_K: f64 = 0.145;
// Standard -110/-110 juice, expressed as a probability inflation.
const VIG_FRACTION: f64 = 0.0476;
const VIG_PROB_CAP: f64 = 0.99;
// Fixed pricing on spread and total markets.
const JUICE_ODDS: i32 = -110;
// Home share of the combined total, in points.
const TEAM_TOTAL_HOME_SKEW: f64 = 1.25;

/// Full derived odds for one matchup. Recomputed on every call; nothing here
/// is cached by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct MatchupOdds {
    pub home_win_prob: f64,
    pub away_win_prob: f64,
    pub home_moneyline: i32,
    pub away_moneyline: i32,
    /// Half-point spread; negative means the home side is favored.
    pub spread: f64,
    pub spread_home_odds: i32,
    pub spread_away_odds: i32,
    pub over_under: f64,
    pub over_odds: i32,
    pub under_odds: i32,
    pub home_team_total: f64,
    pub away_team_total: f64,
    pub expected_diff: f64,
    pub home_field_advantage: f64,
    pub home_power: f64,
    pub away_power: f64,
}

/// Derive win probability, moneylines, spread and totals for a matchup.
///
/// Moneylines are fair (no vig); `vig_adjusted_moneyline` is the explicit
/// presentation-layer step for juiced quotes. Pure function of its inputs,
/// safe to call concurrently.
pub fn calculate_matchup_odds(
    home: &TeamStats,
    away: &TeamStats,
    home_advanced: Option<&AdvancedStats>,
    away_advanced: Option<&AdvancedStats>,
) -> MatchupOdds {
    let home_power = power_rating(home, home_advanced);
    let away_power = power_rating(away, away_advanced);

    let hfa = home_advanced
        .and_then(|adv| adv.hfa)
        .unwrap_or(DEFAULT_HOME_FIELD_ADVANTAGE);

    let expected_diff = (home_power - away_power) + hfa;
    let home_win_prob = logistic_win_prob(expected_diff);

    // Moneylines come from the unrounded probability; the two sides sum to
    // exactly 1 before the independent 3-decimal rounding below.
    let home_moneyline = saturating_american_odds(home_win_prob);
    let away_moneyline = saturating_american_odds(1.0 - home_win_prob);

    let spread = -(expected_diff * 2.0).round() / 2.0;

    // Two independent estimates of the total: each offense against the
    // defense it actually faces.
    let home_vs_away_def = home.ppg_scored + away.ppg_allowed;
    let away_vs_home_def = away.ppg_scored + home.ppg_allowed;
    let over_under = round_half((home_vs_away_def + away_vs_home_def) / 2.0);

    let home_team_total = round_half(home_vs_away_def / 2.0 + TEAM_TOTAL_HOME_SKEW);
    let away_team_total = round_half(away_vs_home_def / 2.0 - TEAM_TOTAL_HOME_SKEW);

    MatchupOdds {
        home_win_prob: round3(home_win_prob),
        away_win_prob: round3(1.0 - home_win_prob),
        home_moneyline,
        away_moneyline,
        spread,
        spread_home_odds: JUICE_ODDS,
        spread_away_odds: JUICE_ODDS,
        over_under,
        over_odds: JUICE_ODDS,
        under_odds: JUICE_ODDS,
        home_team_total,
        away_team_total,
        expected_diff: (expected_diff * 10.0).round() / 10.0,
        home_field_advantage: hfa,
        home_power,
        away_power,
    }
}

/// Logistic link from expected point differential to home win probability.
pub fn logistic_win_prob(expected_diff: f64) -> f64 {
    1.0 / (1.0 + (-LOGISTIC_K * expected_diff).exp())
}

/// Moneyline with standard juice baked in. Presentation-layer only: the
/// odds builder above never applies this to its own output.
pub fn vig_adjusted_moneyline(fair_prob: f64) -> i32 {
    let inflated = (fair_prob * (1.0 + VIG_FRACTION)).min(VIG_PROB_CAP);
    saturating_american_odds(inflated)
}

fn round_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
