use std::collections::HashMap;

use crate::team_stats::{AdvancedStats, Game};

// SRS settles well inside 20 rounds for a league-sized schedule.
const SRS_ITERATIONS: usize = 20;
// Home/away splits are too noisy for a team-specific HFA below this many
// games on each side of the split.
const HFA_MIN_GAMES: usize = 20;

#[derive(Debug, Default, Clone)]
struct TeamRecord {
    wins: u32,
    losses: u32,
    ties: u32,
    points_for: i64,
    points_against: i64,
    opponents: Vec<String>,
}

impl TeamRecord {
    fn games(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Ties count as half a win.
    fn win_pct(&self) -> f64 {
        let games = self.games();
        if games == 0 {
            return 0.5;
        }
        (self.wins as f64 + 0.5 * self.ties as f64) / games as f64
    }

    fn point_diff_per_game(&self) -> f64 {
        let games = self.games();
        if games == 0 {
            return 0.0;
        }
        (self.points_for - self.points_against) as f64 / games as f64
    }
}

/// Compute schedule-adjusted ratings for one season from stored game records.
///
/// The season's completed games drive records, strength of schedule and SRS;
/// the full slice (typically several seasons) feeds the per-team home-field
/// advantage, which needs a deeper home/away history than one season offers.
pub fn compute_advanced_stats(games: &[Game], season: i32) -> HashMap<String, AdvancedStats> {
    let records = build_records(games, season);
    if records.is_empty() {
        return HashMap::new();
    }

    let sos = strength_of_schedule(&records);
    let srs = simple_rating_system(&records);
    let hfa = home_field_advantage(games);

    records
        .iter()
        .map(|(team, rec)| {
            let stats = AdvancedStats {
                team_code: team.clone(),
                season: Some(season),
                srs: round2(srs.get(team).copied().unwrap_or(0.0)),
                sos: Some(round3(sos.get(team).copied().unwrap_or(0.5))),
                win_pct: Some(round3(rec.win_pct())),
                ppd: Some(round2(rec.point_diff_per_game())),
                yards_per_play: None,
                turnover_diff: None,
                hfa: hfa.get(team).map(|v| round2(*v)),
            };
            (team.clone(), stats)
        })
        .collect()
}

fn build_records(games: &[Game], season: i32) -> HashMap<String, TeamRecord> {
    let mut records: HashMap<String, TeamRecord> = HashMap::new();

    for g in games {
        if g.season != season || !g.is_completed {
            continue;
        }
        let (Some(home_score), Some(away_score)) = (g.home_score, g.away_score) else {
            continue;
        };

        let home = records.entry(g.home_team.clone()).or_default();
        home.points_for += home_score as i64;
        home.points_against += away_score as i64;
        home.opponents.push(g.away_team.clone());
        match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => home.wins += 1,
            std::cmp::Ordering::Less => home.losses += 1,
            std::cmp::Ordering::Equal => home.ties += 1,
        }

        let away = records.entry(g.away_team.clone()).or_default();
        away.points_for += away_score as i64;
        away.points_against += home_score as i64;
        away.opponents.push(g.home_team.clone());
        match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => away.losses += 1,
            std::cmp::Ordering::Less => away.wins += 1,
            std::cmp::Ordering::Equal => away.ties += 1,
        }
    }

    records
}

/// SOS = average opponent win percentage.
fn strength_of_schedule(records: &HashMap<String, TeamRecord>) -> HashMap<String, f64> {
    let win_pcts: HashMap<&str, f64> = records
        .iter()
        .map(|(team, rec)| (team.as_str(), rec.win_pct()))
        .collect();

    records
        .iter()
        .map(|(team, rec)| {
            let sos = if rec.opponents.is_empty() {
                0.5
            } else {
                rec.opponents
                    .iter()
                    .map(|opp| win_pcts.get(opp.as_str()).copied().unwrap_or(0.5))
                    .sum::<f64>()
                    / rec.opponents.len() as f64
            };
            (team.clone(), sos)
        })
        .collect()
}

/// Iterative SRS: per-game point differential plus average opponent SRS,
/// re-fed until it settles.
fn simple_rating_system(records: &HashMap<String, TeamRecord>) -> HashMap<String, f64> {
    let ppd: HashMap<String, f64> = records
        .iter()
        .map(|(team, rec)| (team.clone(), rec.point_diff_per_game()))
        .collect();

    let mut srs = ppd.clone();
    for _ in 0..SRS_ITERATIONS {
        let mut next = HashMap::with_capacity(srs.len());
        for (team, rec) in records {
            if rec.opponents.is_empty() {
                next.insert(team.clone(), ppd[team]);
                continue;
            }
            let opp_srs = rec
                .opponents
                .iter()
                .map(|opp| srs.get(opp).copied().unwrap_or(0.0))
                .sum::<f64>()
                / rec.opponents.len() as f64;
            next.insert(team.clone(), ppd[team] + opp_srs);
        }
        srs = next;
    }
    srs
}

/// Team-specific home-field advantage: half the gap between a team's average
/// home margin and its average away margin, over every season supplied.
fn home_field_advantage(games: &[Game]) -> HashMap<String, f64> {
    #[derive(Default)]
    struct Split {
        margin_sum: i64,
        games: usize,
    }

    let mut home: HashMap<String, Split> = HashMap::new();
    let mut away: HashMap<String, Split> = HashMap::new();

    for g in games {
        if !g.is_completed {
            continue;
        }
        let Some(margin) = g.home_margin() else {
            continue;
        };
        let h = home.entry(g.home_team.clone()).or_default();
        h.margin_sum += margin as i64;
        h.games += 1;
        let a = away.entry(g.away_team.clone()).or_default();
        a.margin_sum -= margin as i64;
        a.games += 1;
    }

    home.into_iter()
        .filter_map(|(team, h)| {
            let a = away.get(&team)?;
            if h.games < HFA_MIN_GAMES || a.games < HFA_MIN_GAMES {
                return None;
            }
            let home_margin = h.margin_sum as f64 / h.games as f64;
            let away_margin = a.margin_sum as f64 / a.games as f64;
            Some((team, (home_margin - away_margin) / 2.0))
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(season: i32, week: u32, home: &str, away: &str, hs: i32, a: i32) -> Game {
        Game {
            season,
            week,
            game_date: None,
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_score: Some(hs),
            away_score: Some(a),
            home_first_half: None,
            home_second_half: None,
            away_first_half: None,
            away_second_half: None,
            is_completed: true,
        }
    }

    #[test]
    fn empty_season_yields_empty_map() {
        assert!(compute_advanced_stats(&[], 2025).is_empty());
    }

    #[test]
    fn round_robin_records_and_sos() {
        // A beats B and C; B beats C.
        let games = vec![
            game(2025, 1, "A", "B", 28, 14),
            game(2025, 2, "C", "A", 10, 24),
            game(2025, 3, "B", "C", 21, 17),
        ];
        let stats = compute_advanced_stats(&games, 2025);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats["A"].win_pct, Some(1.0));
        assert_eq!(stats["C"].win_pct, Some(0.0));
        // A played B (0.5) and C (0.0): a soft schedule.
        assert_eq!(stats["A"].sos, Some(0.25));
    }

    #[test]
    fn srs_rewards_the_harder_schedule() {
        // D and E post the same raw differential, but D earned it against the
        // stronger opposition.
        let games = vec![
            game(2025, 1, "D", "S", 27, 17),
            game(2025, 2, "E", "W", 27, 17),
            game(2025, 3, "S", "W", 31, 10),
            game(2025, 4, "W", "S", 13, 20),
        ];
        let stats = compute_advanced_stats(&games, 2025);
        assert!(stats["D"].srs > stats["E"].srs);
    }

    #[test]
    fn hfa_needs_a_deep_home_and_away_history() {
        // 20 home games at +7, 20 away games at -3 for team H.
        let mut games = Vec::new();
        for i in 0..20 {
            games.push(game(2020 + (i % 5), i as u32 + 1, "H", "X", 24, 17));
            games.push(game(2020 + (i % 5), i as u32 + 1, "X", "H", 20, 17));
        }
        let stats = compute_advanced_stats(&games, 2024);
        let hfa = stats["H"].hfa.expect("enough games for a split");
        // (7 - (-3)) / 2.
        assert_eq!(hfa, 5.0);
        // X also wins at home and loses on the road, so its split matches.
        assert_eq!(stats["X"].hfa, Some(5.0));
    }

    #[test]
    fn other_seasons_do_not_leak_into_records() {
        let games = vec![
            game(2024, 1, "A", "B", 35, 0),
            game(2025, 1, "A", "B", 14, 20),
        ];
        let stats = compute_advanced_stats(&games, 2025);
        assert_eq!(stats["A"].win_pct, Some(0.0));
        assert_eq!(stats["A"].ppd, Some(-6.0));
    }
}
