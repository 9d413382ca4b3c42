use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;

use crate::advanced_stats::AdvancedStatsCache;
use crate::matchup_odds::{MatchupOdds, calculate_matchup_odds};
use crate::odds_math::{american_odds_to_probability, expected_value};
use crate::simulation::{ScoreModel, SimulationResult, simulate_matchup};
use crate::store::Store;
use crate::team_stats::{Game, GameProfile, TeamStats, TrendDirection};

/// Minimum model-vs-market edge for a bet to count as value.
pub const VALUE_EDGE_THRESHOLD: f64 = 0.05;
const STRONG_EDGE: f64 = 0.10;

// Factor extraction thresholds.
const MOMENTUM_GAP: f64 = 5.0;
const CONSISTENCY_GAP: f64 = 15.0;
const HIGH_SCORING_ENV: f64 = 48.0;
const LOW_SCORING_ENV: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueRating {
    None,
    Slight,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ValueAssessment {
    pub model_prob: f64,
    pub market_implied_prob: f64,
    pub edge: f64,
    pub expected_value: f64,
    pub has_value: bool,
    pub rating: ValueRating,
}

/// Compare the model's probability against a market moneyline.
pub fn detect_value(model_prob: f64, market_odds: i32, threshold: f64) -> ValueAssessment {
    let implied = american_odds_to_probability(market_odds);
    let edge = model_prob - implied;
    let rating = if edge >= STRONG_EDGE {
        ValueRating::Strong
    } else if edge >= VALUE_EDGE_THRESHOLD {
        ValueRating::Moderate
    } else if edge > 0.0 {
        ValueRating::Slight
    } else {
        ValueRating::None
    };
    ValueAssessment {
        model_prob,
        market_implied_prob: implied,
        edge,
        expected_value: expected_value(market_odds, model_prob),
        has_value: edge >= threshold,
        rating,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Momentum,
    TrendShift,
    Consistency,
    ProfileClash,
    ScoringEnvironment,
}

/// Human-readable matchup signal extracted from statistical anomalies.
#[derive(Debug, Clone, Serialize)]
pub struct MatchupFactor {
    pub kind: FactorKind,
    /// Side the signal favors or concerns; `None` for matchup-wide factors.
    pub side: Option<Side>,
    pub direction: Option<TrendDirection>,
    pub magnitude: f64,
    pub description: String,
}

/// Rule-based extraction of narrative factors for a matchup.
pub fn analyze_matchup_factors(home: &TeamStats, away: &TeamStats) -> Vec<MatchupFactor> {
    let mut factors = Vec::new();

    let momentum_gap = home.ema_differential - away.ema_differential;
    if momentum_gap.abs() > MOMENTUM_GAP {
        let (side, leader) = if momentum_gap > 0.0 {
            (Side::Home, home)
        } else {
            (Side::Away, away)
        };
        factors.push(MatchupFactor {
            kind: FactorKind::Momentum,
            side: Some(side),
            direction: None,
            magnitude: momentum_gap.abs(),
            description: format!(
                "{} has the momentum edge (EMA differential {:+.1} vs {:+.1})",
                leader.team_code, home.ema_differential, away.ema_differential
            ),
        });
    }

    for (side, team) in [(Side::Home, home), (Side::Away, away)] {
        let Some(cp) = team.changepoint else { continue };
        let word = match cp.direction {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
        };
        factors.push(MatchupFactor {
            kind: FactorKind::TrendShift,
            side: Some(side),
            direction: Some(cp.direction),
            magnitude: cp.magnitude.abs(),
            description: format!(
                "{} scoring trending {word} ({:+.1} over recent games)",
                team.team_code, cp.magnitude
            ),
        });
    }

    let consistency_gap = home.scoring_consistency - away.scoring_consistency;
    if consistency_gap.abs() > CONSISTENCY_GAP {
        let (side, steadier) = if consistency_gap > 0.0 {
            (Side::Home, home)
        } else {
            (Side::Away, away)
        };
        factors.push(MatchupFactor {
            kind: FactorKind::Consistency,
            side: Some(side),
            direction: None,
            magnitude: consistency_gap.abs(),
            description: format!(
                "{} is the steadier scoring team (consistency {:.0} vs {:.0})",
                steadier.team_code, home.scoring_consistency, away.scoring_consistency
            ),
        });
    }

    if home.game_profile != GameProfile::Balanced
        && away.game_profile != GameProfile::Balanced
        && home.game_profile != away.game_profile
    {
        let label = |profile: GameProfile| match profile {
            GameProfile::FastStarter => "fast starter",
            GameProfile::Closer => "closer",
            GameProfile::Balanced => "balanced",
        };
        factors.push(MatchupFactor {
            kind: FactorKind::ProfileClash,
            side: None,
            direction: None,
            // Stylistic signal with no natural scale.
            magnitude: 0.0,
            description: format!(
                "profile clash: {} ({}) meets {} ({})",
                home.team_code,
                label(home.game_profile),
                away.team_code,
                label(away.game_profile)
            ),
        });
    }

    let environment = (home.avg_total_points + away.avg_total_points) / 2.0;
    if environment > HIGH_SCORING_ENV {
        factors.push(MatchupFactor {
            kind: FactorKind::ScoringEnvironment,
            side: None,
            direction: None,
            magnitude: environment,
            description: format!("high-scoring environment (combined average {environment:.1})"),
        });
    } else if environment < LOW_SCORING_ENV {
        factors.push(MatchupFactor {
            kind: FactorKind::ScoringEnvironment,
            side: None,
            direction: None,
            magnitude: environment,
            description: format!("low-scoring environment (combined average {environment:.1})"),
        });
    }

    factors
}

/// Confidence in the model's read of a matchup, 0-100.
///
/// A wide simulated margin range is the main detractor; momentum and a clear
/// consistency edge add a little, any trend shift subtracts (a team in
/// transition is harder to project).
pub fn calculate_confidence(sim: &SimulationResult, factors: &[MatchupFactor]) -> f64 {
    let margin_range = sim.margin.p95 - sim.margin.p5;
    let mut score = 100.0 - 2.0 * margin_range;
    for factor in factors {
        if factor.direction.is_some() {
            score -= 5.0;
            continue;
        }
        match factor.kind {
            FactorKind::Momentum => score += 5.0,
            FactorKind::Consistency if factor.side.is_some() => score += 5.0,
            _ => {}
        }
    }
    score.clamp(0.0, 100.0)
}

/// Market moneylines for one game, quoted from the book being beaten.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MarketLine {
    pub home_moneyline: i32,
    pub away_moneyline: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValueOpportunity {
    pub game: Game,
    pub side: Side,
    pub team_code: String,
    pub market_odds: i32,
    pub assessment: ValueAssessment,
    pub odds: MatchupOdds,
    pub factors: Vec<MatchupFactor>,
    pub confidence: f64,
}

/// Scan a season (or one week) of incomplete games for mispriced moneylines.
///
/// Market lines are keyed by `(week, home team code)`; games with no quote
/// are skipped. Opportunities come back sorted by edge, best first.
pub fn find_value_opportunities(
    store: &Store,
    advanced: &AdvancedStatsCache,
    season: i32,
    week: Option<u32>,
    market: &HashMap<(u32, String), MarketLine>,
    threshold: f64,
    iterations: usize,
) -> Result<Vec<ValueOpportunity>> {
    let games = store.get_upcoming_matchups(season, week)?;
    let advanced_map = advanced.load(season);

    let mut opportunities = Vec::new();
    for game in games {
        let Some(line) = market.get(&(game.week, game.home_team.clone())) else {
            continue;
        };

        let home_stats = store
            .get_team_stats(&game.home_team, season)?
            .unwrap_or_else(|| TeamStats::league_average(&game.home_team, season));
        let away_stats = store
            .get_team_stats(&game.away_team, season)?
            .unwrap_or_else(|| TeamStats::league_average(&game.away_team, season));
        let home_advanced = advanced_map.get(&game.home_team);
        let away_advanced = advanced_map.get(&game.away_team);

        let odds = calculate_matchup_odds(&home_stats, &away_stats, home_advanced, away_advanced);
        let sim = simulate_matchup(
            &home_stats,
            &away_stats,
            home_advanced,
            away_advanced,
            iterations,
            ScoreModel::RatingAdjusted,
        )?;
        let factors = analyze_matchup_factors(&home_stats, &away_stats);
        let confidence = calculate_confidence(&sim, &factors);

        let sides = [
            (Side::Home, game.home_team.clone(), odds.home_win_prob, line.home_moneyline),
            (Side::Away, game.away_team.clone(), odds.away_win_prob, line.away_moneyline),
        ];
        for (side, team_code, model_prob, market_odds) in sides {
            let assessment = detect_value(model_prob, market_odds, threshold);
            if !assessment.has_value {
                continue;
            }
            opportunities.push(ValueOpportunity {
                game: game.clone(),
                side,
                team_code,
                market_odds,
                assessment,
                odds: odds.clone(),
                factors: factors.clone(),
                confidence,
            });
        }
    }

    opportunities.sort_by(|a, b| b.assessment.edge.total_cmp(&a.assessment.edge));
    Ok(opportunities)
}
