use crate::team_stats::{AdvancedStats, LEAGUE_AVG_YARDS_PER_PLAY, TeamStats};

// Points of rating per yard-per-play above league average.
const EFFICIENCY_WEIGHT: f64 = 2.0;
// Points of rating per net turnover.
const TURNOVER_WEIGHT: f64 = 0.2;
// How far the rating is pulled toward the last-5 point differential.
const RECENT_FORM_WEIGHT: f64 = 0.15;

/// Single scalar team-strength rating on a point-differential scale
/// (positive = stronger than league average).
///
/// With advanced stats the schedule-adjusted rating is the anchor, nudged by
/// efficiency and turnover margin; without them the season PPG differential
/// is blended with recent form. Deterministic, no side effects.
pub fn power_rating(stats: &TeamStats, advanced: Option<&AdvancedStats>) -> f64 {
    let recent_diff = stats.recent_differential();

    match advanced {
        Some(adv) => {
            let mut rating = adv.srs;
            if let Some(ypp) = adv.yards_per_play {
                rating += (ypp - LEAGUE_AVG_YARDS_PER_PLAY) * EFFICIENCY_WEIGHT;
            }
            if let Some(to_diff) = adv.turnover_diff {
                rating += to_diff * TURNOVER_WEIGHT;
            }
            rating + (recent_diff - rating) * RECENT_FORM_WEIGHT
        }
        None => {
            let base = stats.season_differential();
            (1.0 - RECENT_FORM_WEIGHT) * base + RECENT_FORM_WEIGHT * recent_diff
        }
    }
}
