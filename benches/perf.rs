use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

use gridline::matchup_odds::calculate_matchup_odds;
use gridline::power_rating::power_rating;
use gridline::simulation::{DEFAULT_ITERATIONS, ScoreModel, simulate_matchup_with_rng};
use gridline::stats_build::build_all_team_stats;
use gridline::team_stats::{Game, TeamStats};

fn sample_stats(code: &str, ppg: f64, allowed: f64) -> TeamStats {
    TeamStats {
        ppg_scored: ppg,
        ppg_allowed: allowed,
        last_5_ppg: ppg + 1.5,
        last_5_ppg_allowed: allowed - 0.5,
        scoring_std_dev: 9.2,
        ..TeamStats::league_average(code, 2025)
    }
}

fn sample_season() -> Vec<Game> {
    // A 12-team double round robin with drifting scores: enough volume to
    // exercise the aggregation paths.
    let codes = [
        "KC", "BUF", "BAL", "CIN", "SF", "DET", "PHI", "DAL", "MIA", "NYJ", "LV", "DEN",
    ];
    let mut games = Vec::new();
    let mut week = 1u32;
    for (i, home) in codes.iter().enumerate() {
        for (j, away) in codes.iter().enumerate() {
            if i == j {
                continue;
            }
            let home_score = 17 + ((i * 7 + j * 3 + week as usize) % 21) as i32;
            let away_score = 13 + ((j * 5 + i * 2 + week as usize) % 24) as i32;
            games.push(Game {
                season: 2025,
                week,
                game_date: Some(format!("2025-09-{:02}", (week % 28) + 1)),
                home_team: home.to_string(),
                away_team: away.to_string(),
                home_score: Some(home_score),
                away_score: Some(away_score),
                home_first_half: Some(home_score / 2),
                home_second_half: Some(home_score - home_score / 2),
                away_first_half: Some(away_score / 2),
                away_second_half: Some(away_score - away_score / 2),
                is_completed: true,
            });
            week = week % 18 + 1;
        }
    }
    games
}

fn bench_power_rating(c: &mut Criterion) {
    let stats = sample_stats("KC", 27.8, 19.4);
    c.bench_function("power_rating", |b| {
        b.iter(|| black_box(power_rating(black_box(&stats), None)))
    });
}

fn bench_matchup_odds(c: &mut Criterion) {
    let home = sample_stats("KC", 27.8, 19.4);
    let away = sample_stats("LV", 18.9, 24.6);
    c.bench_function("matchup_odds", |b| {
        b.iter(|| {
            let odds = calculate_matchup_odds(black_box(&home), black_box(&away), None, None);
            black_box(odds.home_win_prob);
        })
    });
}

fn bench_simulation_10k(c: &mut Criterion) {
    let home = sample_stats("KC", 27.8, 19.4);
    let away = sample_stats("LV", 18.9, 24.6);
    c.bench_function("simulation_10k", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(77);
            let sim = simulate_matchup_with_rng(
                black_box(&home),
                black_box(&away),
                None,
                None,
                DEFAULT_ITERATIONS,
                ScoreModel::RatingAdjusted,
                &mut rng,
            )
            .unwrap();
            black_box(sim.home_win_prob);
        })
    });
}

fn bench_full_slate(c: &mut Criterion) {
    // A weekly slate: 16 matchups, odds plus a 10k-iteration simulation each.
    let teams: Vec<TeamStats> = (0..32)
        .map(|i| {
            sample_stats(
                &format!("T{i:02}"),
                18.0 + (i as f64) * 0.4,
                26.0 - (i as f64) * 0.3,
            )
        })
        .collect();
    c.bench_function("full_slate_16_games", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(5);
            for pair in teams.chunks(2) {
                let odds = calculate_matchup_odds(&pair[0], &pair[1], None, None);
                let sim = simulate_matchup_with_rng(
                    &pair[0],
                    &pair[1],
                    None,
                    None,
                    DEFAULT_ITERATIONS,
                    ScoreModel::RatingAdjusted,
                    &mut rng,
                )
                .unwrap();
                black_box((odds.spread, sim.home_win_prob));
            }
        })
    });
}

fn bench_stats_build(c: &mut Criterion) {
    let games = sample_season();
    c.bench_function("stats_build_season", |b| {
        b.iter(|| black_box(build_all_team_stats(black_box(&games), 2025)).len())
    });
}

criterion_group!(
    perf,
    bench_power_rating,
    bench_matchup_odds,
    bench_simulation_10k,
    bench_full_slate,
    bench_stats_build
);
criterion_main!(perf);
