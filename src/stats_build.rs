use crate::team_stats::{Changepoint, Game, GameProfile, TeamStats, TrendDirection};

// EMA weight on the newest game.
const EMA_ALPHA: f64 = 0.3;
// Changepoint detection compares the last `window` games to the window
// before them.
const CHANGEPOINT_WINDOW: usize = 3;
const CHANGEPOINT_THRESHOLD: f64 = 5.0;
// First/second-half differential gap that marks a fast starter or a closer.
const PROFILE_GAP: f64 = 2.0;

/// Aggregate a team's completed games into a full [`TeamStats`] record.
/// Returns `None` when the team has no completed games in the slice.
pub fn build_team_stats(games: &[Game], team_code: &str, season: i32) -> Option<TeamStats> {
    let mut team_games: Vec<&Game> = games
        .iter()
        .filter(|g| {
            g.season == season
                && g.is_completed
                && g.home_score.is_some()
                && g.away_score.is_some()
                && (g.home_team == team_code || g.away_team == team_code)
        })
        .collect();
    if team_games.is_empty() {
        return None;
    }

    // Week then date gives a stable chronological order; dates are ISO-ish
    // strings so string ordering is fine.
    team_games.sort_by(|a, b| {
        a.week
            .cmp(&b.week)
            .then_with(|| a.game_date.cmp(&b.game_date))
    });

    let mut scored = Vec::with_capacity(team_games.len());
    let mut allowed = Vec::with_capacity(team_games.len());
    let mut first_half_diffs = Vec::new();
    let mut second_half_diffs = Vec::new();
    let mut wins = 0u32;
    let mut losses = 0u32;
    let mut ties = 0u32;

    for g in &team_games {
        let is_home = g.home_team == team_code;
        let (s, a) = if is_home {
            (g.home_score.unwrap_or(0), g.away_score.unwrap_or(0))
        } else {
            (g.away_score.unwrap_or(0), g.home_score.unwrap_or(0))
        };
        scored.push(s as f64);
        allowed.push(a as f64);

        if s > a {
            wins += 1;
        } else if s < a {
            losses += 1;
        } else {
            ties += 1;
        }

        let halves = if is_home {
            (
                g.home_first_half,
                g.home_second_half,
                g.away_first_half,
                g.away_second_half,
            )
        } else {
            (
                g.away_first_half,
                g.away_second_half,
                g.home_first_half,
                g.home_second_half,
            )
        };
        if let (Some(h1s), Some(h2s), Some(h1a), Some(h2a)) = halves {
            first_half_diffs.push((h1s - h1a) as f64);
            second_half_diffs.push((h2s - h2a) as f64);
        }
    }

    let last_5_start = team_games.len().saturating_sub(5);
    let totals: Vec<f64> = scored
        .iter()
        .zip(&allowed)
        .map(|(s, a)| s + a)
        .collect();

    let ema_ppg = ema(&scored, EMA_ALPHA);
    let ema_allowed = ema(&allowed, EMA_ALPHA);

    Some(TeamStats {
        team_code: team_code.to_string(),
        season,
        games_played: team_games.len() as u32,
        wins,
        losses,
        ties,
        ppg_scored: round1(mean(&scored)),
        ppg_allowed: round1(mean(&allowed)),
        last_5_ppg: round1(mean(&scored[last_5_start..])),
        last_5_ppg_allowed: round1(mean(&allowed[last_5_start..])),
        scoring_std_dev: round2(std_dev(&scored)),
        ema_differential: round2(ema_ppg - ema_allowed),
        changepoint: detect_changepoint(&scored),
        scoring_consistency: round1(consistency(&scored)),
        game_profile: game_profile(&first_half_diffs, &second_half_diffs),
        avg_total_points: round1(mean(&totals)),
    })
}

/// Stats for every team that appears in the season's completed games,
/// strongest point differential first.
pub fn build_all_team_stats(games: &[Game], season: i32) -> Vec<TeamStats> {
    let mut codes: Vec<&str> = games
        .iter()
        .filter(|g| g.season == season)
        .flat_map(|g| [g.home_team.as_str(), g.away_team.as_str()])
        .collect();
    codes.sort_unstable();
    codes.dedup();

    let mut out: Vec<TeamStats> = codes
        .into_iter()
        .filter_map(|code| build_team_stats(games, code, season))
        .collect();
    out.sort_by(|a, b| b.season_differential().total_cmp(&a.season_differential()));
    out
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; under two samples there is no spread to
/// measure.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn ema(values: &[f64], alpha: f64) -> f64 {
    let Some(first) = values.first() else {
        return 0.0;
    };
    values[1..]
        .iter()
        .fold(*first, |acc, v| alpha * v + (1.0 - alpha) * acc)
}

/// Consistency on a 0-100 scale from the inverted coefficient of variation:
/// no spread scores 100, a CV of 1 or worse scores 0.
fn consistency(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 100.0;
    }
    let avg = mean(values);
    if avg == 0.0 {
        return 0.0;
    }
    let cv = std_dev(values) / avg;
    (100.0 * (1.0 - cv)).clamp(0.0, 100.0)
}

fn detect_changepoint(values: &[f64]) -> Option<Changepoint> {
    if values.len() < CHANGEPOINT_WINDOW * 2 {
        return None;
    }
    let recent = mean(&values[values.len() - CHANGEPOINT_WINDOW..]);
    let prior = mean(&values[values.len() - CHANGEPOINT_WINDOW * 2..values.len() - CHANGEPOINT_WINDOW]);
    let diff = recent - prior;
    if diff.abs() < CHANGEPOINT_THRESHOLD {
        return None;
    }
    Some(Changepoint {
        direction: if diff > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        },
        magnitude: round1(diff),
    })
}

fn game_profile(first_half_diffs: &[f64], second_half_diffs: &[f64]) -> GameProfile {
    if first_half_diffs.is_empty() || second_half_diffs.is_empty() {
        return GameProfile::Balanced;
    }
    let first = mean(first_half_diffs);
    let second = mean(second_half_diffs);
    if first > second + PROFILE_GAP {
        GameProfile::FastStarter
    } else if second > first + PROFILE_GAP {
        GameProfile::Closer
    } else {
        GameProfile::Balanced
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
