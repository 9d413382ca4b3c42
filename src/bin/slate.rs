use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rayon::prelude::*;

use gridline::advanced_stats::AdvancedStatsCache;
use gridline::matchup_odds::calculate_matchup_odds;
use gridline::odds_math::{format_odds, format_spread};
use gridline::simulation::{DEFAULT_ITERATIONS, ScoreModel, simulate_matchup};
use gridline::store::Store;
use gridline::team_stats::TeamStats;
use gridline::value::{
    MarketLine, VALUE_EDGE_THRESHOLD, analyze_matchup_factors, find_value_opportunities,
};

/// Market quotes as they arrive on disk: one row per game.
#[derive(Debug, serde::Deserialize)]
struct MarketQuote {
    week: u32,
    home_team: String,
    home_moneyline: i32,
    away_moneyline: i32,
}

struct Args {
    db_path: PathBuf,
    season: i32,
    week: Option<u32>,
    market_path: Option<PathBuf>,
    iterations: usize,
}

fn parse_args() -> Result<Args> {
    let mut db_path = None;
    let mut season = None;
    let mut week = None;
    let mut market_path = None;
    let mut iterations = DEFAULT_ITERATIONS;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--week" => {
                let value = args.next().context("--week needs a number")?;
                week = Some(value.parse::<u32>().context("bad --week value")?);
            }
            "--market" => {
                let value = args.next().context("--market needs a file path")?;
                market_path = Some(PathBuf::from(value));
            }
            "--iterations" => {
                let value = args.next().context("--iterations needs a number")?;
                iterations = value.parse::<usize>().context("bad --iterations value")?;
            }
            other if db_path.is_none() => db_path = Some(PathBuf::from(other)),
            other if season.is_none() => {
                season = Some(other.parse::<i32>().context("bad season value")?);
            }
            other => bail!("unexpected argument {other}"),
        }
    }

    Ok(Args {
        db_path: db_path.context("usage: slate <db> <season> [--week N] [--market quotes.json]")?,
        season: season.context("season argument required")?,
        week,
        market_path,
        iterations,
    })
}

fn load_market(path: &PathBuf) -> Result<HashMap<(u32, String), MarketLine>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read market quotes {}", path.display()))?;
    let quotes: Vec<MarketQuote> = serde_json::from_str(&raw).context("parse market quotes")?;
    Ok(quotes
        .into_iter()
        .map(|q| {
            (
                (q.week, q.home_team),
                MarketLine {
                    home_moneyline: q.home_moneyline,
                    away_moneyline: q.away_moneyline,
                },
            )
        })
        .collect())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;
    let store = Store::open(&args.db_path)?;
    let advanced = match std::env::var("ADVANCED_STATS_URL") {
        Ok(url) if !url.trim().is_empty() => AdvancedStatsCache::new(url),
        _ => AdvancedStatsCache::offline(),
    };
    let advanced_map = advanced.load(args.season);

    let games = store.get_upcoming_matchups(args.season, args.week)?;
    if games.is_empty() {
        println!("no upcoming games for season {}", args.season);
        return Ok(());
    }

    // Stats lookups stay on this thread; the per-game odds + simulation work
    // fans out across the pool.
    let mut inputs = Vec::with_capacity(games.len());
    for game in &games {
        let home = store
            .get_team_stats(&game.home_team, args.season)?
            .unwrap_or_else(|| TeamStats::league_average(&game.home_team, args.season));
        let away = store
            .get_team_stats(&game.away_team, args.season)?
            .unwrap_or_else(|| TeamStats::league_average(&game.away_team, args.season));
        inputs.push((game, home, away));
    }

    let rows: Vec<Result<String>> = inputs
        .par_iter()
        .map(|(game, home, away)| {
            let home_adv = advanced_map.get(&game.home_team);
            let away_adv = advanced_map.get(&game.away_team);
            let odds = calculate_matchup_odds(home, away, home_adv, away_adv);
            let sim = simulate_matchup(
                home,
                away,
                home_adv,
                away_adv,
                args.iterations,
                ScoreModel::RatingAdjusted,
            )?;
            let factors = analyze_matchup_factors(home, away);

            let mut row = format!(
                "W{:<2} {:>3} @ {:<3}  {} {:>5}  ML {}/{}  O/U {:.1}  sim home {:.1}%  margin p50 {:+.1}",
                game.week,
                game.away_team,
                game.home_team,
                game.home_team,
                format_spread(odds.spread),
                format_odds(odds.home_moneyline),
                format_odds(odds.away_moneyline),
                odds.over_under,
                sim.home_win_prob * 100.0,
                sim.margin.p50,
            );
            for factor in &factors {
                row.push_str(&format!("\n      - {}", factor.description));
            }
            Ok(row)
        })
        .collect();

    println!(
        "=== {} slate (computed {}) ===",
        args.season,
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    );
    for row in rows {
        println!("{}", row?);
    }

    let Some(market_path) = &args.market_path else {
        return Ok(());
    };
    let market = load_market(market_path)?;
    let opportunities = find_value_opportunities(
        &store,
        &advanced,
        args.season,
        args.week,
        &market,
        VALUE_EDGE_THRESHOLD,
        args.iterations,
    )?;

    println!("\n=== value opportunities ===");
    if opportunities.is_empty() {
        println!("none at a {:.0}% edge threshold", VALUE_EDGE_THRESHOLD * 100.0);
        return Ok(());
    }
    for opp in &opportunities {
        println!(
            "W{:<2} {} {:?} {}  edge {:+.1}%  model {:.1}% vs implied {:.1}%  ev {:+.3}/unit  confidence {:.0}",
            opp.game.week,
            opp.team_code,
            opp.assessment.rating,
            format_odds(opp.market_odds),
            opp.assessment.edge * 100.0,
            opp.assessment.model_prob * 100.0,
            opp.assessment.market_implied_prob * 100.0,
            opp.assessment.expected_value,
            opp.confidence,
        );
    }

    Ok(())
}
