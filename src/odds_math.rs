use anyhow::{Result, bail};

// American odds saturate at the bookmaker-style caps instead of running off
// to infinity as the probability approaches 0 or 1.
const MAX_UNDERDOG_ODDS: i32 = 10_000;
const MAX_FAVORITE_ODDS: i32 = -10_000;

/// Convert a win probability to American odds.
///
/// Probabilities outside [0, 1] (NaN included) are a caller contract
/// violation. Exactly 0 or 1 saturate to the caps, which also keeps the
/// favorite/underdog branches free of division by zero.
pub fn probability_to_american_odds(prob: f64) -> Result<i32> {
    if !(0.0..=1.0).contains(&prob) {
        bail!("win probability {prob} outside [0, 1]");
    }
    Ok(saturating_american_odds(prob))
}

/// Same conversion for callers that already hold a model probability in
/// [0, 1]; out-of-range input saturates instead of erroring.
pub fn saturating_american_odds(prob: f64) -> i32 {
    if prob <= 0.0 {
        return MAX_UNDERDOG_ODDS;
    }
    if prob >= 1.0 {
        return MAX_FAVORITE_ODDS;
    }
    if prob >= 0.5 {
        // Favorite: negative odds.
        (-100.0 * prob / (1.0 - prob)).round() as i32
    } else {
        // Underdog: positive odds.
        (100.0 * (1.0 - prob) / prob).round() as i32
    }
}

/// Implied win probability of quoted American odds.
pub fn american_odds_to_probability(odds: i32) -> f64 {
    if odds < 0 {
        let stake = odds.abs() as f64;
        stake / (stake + 100.0)
    } else {
        100.0 / (odds as f64 + 100.0)
    }
}

/// Expected net return per unit staked at the quoted odds, given the model's
/// true win probability.
pub fn expected_value(odds: i32, true_prob: f64) -> f64 {
    let win_return = if odds > 0 {
        odds as f64 / 100.0
    } else {
        100.0 / odds.abs() as f64
    };
    true_prob * win_return - (1.0 - true_prob)
}

pub fn format_odds(odds: i32) -> String {
    if odds > 0 {
        format!("+{odds}")
    } else {
        odds.to_string()
    }
}

pub fn format_spread(spread: f64) -> String {
    if spread == 0.0 {
        "PK".to_string()
    } else {
        format!("{spread:+.1}")
    }
}
