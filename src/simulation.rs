use anyhow::{Result, bail};
use rand::Rng;

use crate::power_rating::power_rating;
use crate::team_stats::{AdvancedStats, DEFAULT_HOME_FIELD_ADVANTAGE, TeamStats};

pub const DEFAULT_ITERATIONS: usize = 10_000;

// Home share of the expected total under the raw-PPG score model.
const EXPECTED_SCORE_HOME_SKEW: f64 = 1.25;

/// How each side's expected score is derived before sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreModel {
    /// Split the combined expected total with the offense-vs-defense PPG
    /// formula plus a fixed home skew.
    RawPpg,
    /// Derive the expected margin from power ratings and split the raw-PPG
    /// expected total around it.
    RatingAdjusted,
}

#[derive(Debug, Clone, Copy)]
pub struct Distribution {
    pub mean: f64,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

/// Empirical distributions from one simulation run. The sorted sample series
/// stay on the value so threshold queries are plain methods instead of
/// closures capturing the arrays.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub iterations: usize,
    pub home_win_prob: f64,
    pub margin: Distribution,
    pub total: Distribution,
    margins: Vec<f64>,
    totals: Vec<f64>,
}

impl SimulationResult {
    /// Fraction of iterations where the home margin exceeded `threshold`.
    /// With a spread of -6.5, `spread_cover_prob(6.5)` is the cover chance.
    pub fn spread_cover_prob(&self, threshold: f64) -> f64 {
        exceed_fraction(&self.margins, threshold)
    }

    /// Fraction of iterations where the combined score exceeded `threshold`.
    pub fn over_prob(&self, threshold: f64) -> f64 {
        exceed_fraction(&self.totals, threshold)
    }
}

/// Run the simulation with a caller-supplied random source, so outcomes are
/// reproducible under a fixed seed.
pub fn simulate_matchup_with_rng<R: Rng>(
    home: &TeamStats,
    away: &TeamStats,
    home_advanced: Option<&AdvancedStats>,
    away_advanced: Option<&AdvancedStats>,
    iterations: usize,
    model: ScoreModel,
    rng: &mut R,
) -> Result<SimulationResult> {
    if iterations == 0 {
        bail!("simulation iteration count must be positive");
    }

    let (home_expected, away_expected) =
        expected_scores(home, away, home_advanced, away_advanced, model);

    let mut margins = Vec::with_capacity(iterations);
    let mut totals = Vec::with_capacity(iterations);
    let mut home_wins = 0usize;

    for _ in 0..iterations {
        // Scores can't go negative; the normal tail below zero piles up at 0.
        let home_score = sample_normal(rng, home_expected, home.scoring_std_dev).max(0.0);
        let away_score = sample_normal(rng, away_expected, away.scoring_std_dev).max(0.0);

        if home_score > away_score {
            home_wins += 1;
        }
        margins.push(home_score - away_score);
        totals.push(home_score + away_score);
    }

    margins.sort_by(|a, b| a.total_cmp(b));
    totals.sort_by(|a, b| a.total_cmp(b));

    Ok(SimulationResult {
        iterations,
        home_win_prob: home_wins as f64 / iterations as f64,
        margin: distribution_of(&margins),
        total: distribution_of(&totals),
        margins,
        totals,
    })
}

/// Convenience wrapper over the thread-local RNG.
pub fn simulate_matchup(
    home: &TeamStats,
    away: &TeamStats,
    home_advanced: Option<&AdvancedStats>,
    away_advanced: Option<&AdvancedStats>,
    iterations: usize,
    model: ScoreModel,
) -> Result<SimulationResult> {
    let mut rng = rand::thread_rng();
    simulate_matchup_with_rng(
        home,
        away,
        home_advanced,
        away_advanced,
        iterations,
        model,
        &mut rng,
    )
}

fn expected_scores(
    home: &TeamStats,
    away: &TeamStats,
    home_advanced: Option<&AdvancedStats>,
    away_advanced: Option<&AdvancedStats>,
    model: ScoreModel,
) -> (f64, f64) {
    // The expected total always comes from the raw PPG matchup formula,
    // whichever model splits it.
    let home_vs_away_def = (home.ppg_scored + away.ppg_allowed) / 2.0;
    let away_vs_home_def = (away.ppg_scored + home.ppg_allowed) / 2.0;

    match model {
        ScoreModel::RawPpg => (
            home_vs_away_def + EXPECTED_SCORE_HOME_SKEW,
            away_vs_home_def - EXPECTED_SCORE_HOME_SKEW,
        ),
        ScoreModel::RatingAdjusted => {
            let home_power = power_rating(home, home_advanced);
            let away_power = power_rating(away, away_advanced);
            let hfa = home_advanced
                .and_then(|adv| adv.hfa)
                .unwrap_or(DEFAULT_HOME_FIELD_ADVANTAGE);
            let expected_margin = (home_power - away_power) + hfa;
            let expected_total = home_vs_away_def + away_vs_home_def;
            (
                (expected_total + expected_margin) / 2.0,
                (expected_total - expected_margin) / 2.0,
            )
        }
    }
}

/// One draw from Normal(mean, std_dev) via the Box-Muller transform.
fn sample_normal<R: Rng>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // u1 must stay off zero for the log.
    let u1: f64 = rng.gen_range(0.0..1.0f64).max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen_range(0.0..1.0f64);
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    mean + z * std_dev
}

fn distribution_of(sorted: &[f64]) -> Distribution {
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    Distribution {
        mean,
        p5: percentile(sorted, 5.0),
        p25: percentile(sorted, 25.0),
        p50: percentile(sorted, 50.0),
        p75: percentile(sorted, 75.0),
        p95: percentile(sorted, 95.0),
    }
}

/// Percentile with linear interpolation between order statistics.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
    }
}

fn exceed_fraction(sorted: &[f64], threshold: f64) -> f64 {
    let first_above = sorted.partition_point(|value| *value <= threshold);
    (sorted.len() - first_above) as f64 / sorted.len() as f64
}
