use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::team_stats::{
    Changepoint, Game, GameProfile, LEAGUE_AVG_CONSISTENCY, LEAGUE_AVG_PPG,
    LEAGUE_AVG_TOTAL_POINTS, LEAGUE_SCORING_STD_DEV, TeamStats, TrendDirection,
};

/// Read adapter over the relational store of games and season team stats.
///
/// This is the single place where missing or malformed columns resolve to
/// league defaults; everything downstream works with complete records.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite db {}", path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS games (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    season INTEGER NOT NULL,
                    week INTEGER NOT NULL,
                    game_date TEXT,
                    home_team TEXT NOT NULL,
                    away_team TEXT NOT NULL,
                    home_score INTEGER,
                    away_score INTEGER,
                    home_1h INTEGER, home_2h INTEGER,
                    away_1h INTEGER, away_2h INTEGER,
                    is_completed INTEGER DEFAULT 0
                );
                CREATE INDEX IF NOT EXISTS idx_games_season_week ON games(season, week);

                CREATE TABLE IF NOT EXISTS team_stats (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    team_code TEXT NOT NULL,
                    season INTEGER NOT NULL,
                    games_played INTEGER,
                    wins INTEGER, losses INTEGER, ties INTEGER,
                    ppg_scored REAL,
                    ppg_allowed REAL,
                    last_5_ppg REAL,
                    last_5_ppg_allowed REAL,
                    scoring_std_dev REAL,
                    ema_differential REAL,
                    scoring_changepoint INTEGER,
                    scoring_changepoint_direction TEXT,
                    scoring_changepoint_magnitude REAL,
                    scoring_consistency REAL,
                    game_profile TEXT,
                    avg_total_points REAL,
                    UNIQUE(team_code, season)
                );
                "#,
            )
            .context("create sqlite schema")?;
        Ok(())
    }

    /// Season stats for one team; `None` when the team has no row. Callers
    /// usually follow up with `TeamStats::league_average`.
    pub fn get_team_stats(&self, team_code: &str, season: i32) -> Result<Option<TeamStats>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT team_code, season, games_played, wins, losses, ties,
                       ppg_scored, ppg_allowed, last_5_ppg, last_5_ppg_allowed,
                       scoring_std_dev, ema_differential,
                       scoring_changepoint, scoring_changepoint_direction,
                       scoring_changepoint_magnitude,
                       scoring_consistency, game_profile, avg_total_points
                FROM team_stats
                WHERE team_code = ?1 AND season = ?2
                "#,
                params![team_code, season],
                |row| {
                    Ok(TeamStatsRow {
                        team_code: row.get(0)?,
                        season: row.get(1)?,
                        games_played: row.get(2)?,
                        wins: row.get(3)?,
                        losses: row.get(4)?,
                        ties: row.get(5)?,
                        ppg_scored: row.get(6)?,
                        ppg_allowed: row.get(7)?,
                        last_5_ppg: row.get(8)?,
                        last_5_ppg_allowed: row.get(9)?,
                        scoring_std_dev: row.get(10)?,
                        ema_differential: row.get(11)?,
                        scoring_changepoint: row.get::<_, Option<i64>>(12)?.unwrap_or(0) != 0,
                        scoring_changepoint_direction: row.get(13)?,
                        scoring_changepoint_magnitude: row.get(14)?,
                        scoring_consistency: row.get(15)?,
                        game_profile: row.get(16)?,
                        avg_total_points: row.get(17)?,
                    })
                },
            )
            .optional()
            .context("query team stats")?;
        Ok(row.map(TeamStatsRow::into_stats))
    }

    /// Incomplete games for a season, ordered by week then date. `week`
    /// narrows to a single slate.
    pub fn get_upcoming_matchups(&self, season: i32, week: Option<u32>) -> Result<Vec<Game>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT season, week, game_date, home_team, away_team,
                       home_score, away_score,
                       home_1h, home_2h, away_1h, away_2h, is_completed
                FROM games
                WHERE season = ?1 AND is_completed = 0
                  AND (?2 IS NULL OR week = ?2)
                ORDER BY week, game_date
                "#,
            )
            .context("prepare upcoming matchups query")?;
        let rows = stmt
            .query_map(params![season, week], game_from_row)
            .context("query upcoming matchups")?;
        let mut games = Vec::new();
        for row in rows {
            games.push(row.context("read upcoming matchup row")?);
        }
        Ok(games)
    }

    /// Every stored game, optionally narrowed to one season. Feeds the stat
    /// builders, which filter to completed games themselves.
    pub fn load_games(&self, season: Option<i32>) -> Result<Vec<Game>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT season, week, game_date, home_team, away_team,
                       home_score, away_score,
                       home_1h, home_2h, away_1h, away_2h, is_completed
                FROM games
                WHERE (?1 IS NULL OR season = ?1)
                ORDER BY season, week, game_date
                "#,
            )
            .context("prepare games query")?;
        let rows = stmt
            .query_map(params![season], game_from_row)
            .context("query games")?;
        let mut games = Vec::new();
        for row in rows {
            games.push(row.context("read game row")?);
        }
        Ok(games)
    }

    pub fn insert_game(&self, game: &Game) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO games (season, week, game_date, home_team, away_team,
                                   home_score, away_score,
                                   home_1h, home_2h, away_1h, away_2h, is_completed)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
                params![
                    game.season,
                    game.week,
                    game.game_date,
                    game.home_team,
                    game.away_team,
                    game.home_score,
                    game.away_score,
                    game.home_first_half,
                    game.home_second_half,
                    game.away_first_half,
                    game.away_second_half,
                    game.is_completed,
                ],
            )
            .context("insert game")?;
        Ok(())
    }

    pub fn upsert_team_stats(&self, stats: &TeamStats) -> Result<()> {
        let (cp_flag, cp_dir, cp_mag) = match stats.changepoint {
            Some(cp) => (
                true,
                Some(match cp.direction {
                    TrendDirection::Up => "up",
                    TrendDirection::Down => "down",
                }),
                Some(cp.magnitude),
            ),
            None => (false, None, None),
        };
        let profile = match stats.game_profile {
            GameProfile::FastStarter => "fast_starter",
            GameProfile::Closer => "closer",
            GameProfile::Balanced => "balanced",
        };
        self.conn
            .execute(
                r#"
                INSERT INTO team_stats (team_code, season, games_played, wins, losses, ties,
                                        ppg_scored, ppg_allowed, last_5_ppg, last_5_ppg_allowed,
                                        scoring_std_dev, ema_differential,
                                        scoring_changepoint, scoring_changepoint_direction,
                                        scoring_changepoint_magnitude,
                                        scoring_consistency, game_profile, avg_total_points)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                ON CONFLICT(team_code, season) DO UPDATE SET
                    games_played = excluded.games_played,
                    wins = excluded.wins,
                    losses = excluded.losses,
                    ties = excluded.ties,
                    ppg_scored = excluded.ppg_scored,
                    ppg_allowed = excluded.ppg_allowed,
                    last_5_ppg = excluded.last_5_ppg,
                    last_5_ppg_allowed = excluded.last_5_ppg_allowed,
                    scoring_std_dev = excluded.scoring_std_dev,
                    ema_differential = excluded.ema_differential,
                    scoring_changepoint = excluded.scoring_changepoint,
                    scoring_changepoint_direction = excluded.scoring_changepoint_direction,
                    scoring_changepoint_magnitude = excluded.scoring_changepoint_magnitude,
                    scoring_consistency = excluded.scoring_consistency,
                    game_profile = excluded.game_profile,
                    avg_total_points = excluded.avg_total_points
                "#,
                params![
                    stats.team_code,
                    stats.season,
                    stats.games_played,
                    stats.wins,
                    stats.losses,
                    stats.ties,
                    stats.ppg_scored,
                    stats.ppg_allowed,
                    stats.last_5_ppg,
                    stats.last_5_ppg_allowed,
                    stats.scoring_std_dev,
                    stats.ema_differential,
                    cp_flag,
                    cp_dir,
                    cp_mag,
                    stats.scoring_consistency,
                    profile,
                    stats.avg_total_points,
                ],
            )
            .context("upsert team stats")?;
        Ok(())
    }
}

fn game_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Game> {
    Ok(Game {
        season: row.get(0)?,
        week: row.get(1)?,
        game_date: row.get(2)?,
        home_team: row.get(3)?,
        away_team: row.get(4)?,
        home_score: row.get(5)?,
        away_score: row.get(6)?,
        home_first_half: row.get(7)?,
        home_second_half: row.get(8)?,
        away_first_half: row.get(9)?,
        away_second_half: row.get(10)?,
        is_completed: row.get::<_, i64>(11)? != 0,
    })
}

/// Raw row shape: every stat column may be NULL. `into_stats` is the one
/// normalization step applying the league fallbacks.
struct TeamStatsRow {
    team_code: String,
    season: i32,
    games_played: Option<u32>,
    wins: Option<u32>,
    losses: Option<u32>,
    ties: Option<u32>,
    ppg_scored: Option<f64>,
    ppg_allowed: Option<f64>,
    last_5_ppg: Option<f64>,
    last_5_ppg_allowed: Option<f64>,
    scoring_std_dev: Option<f64>,
    ema_differential: Option<f64>,
    scoring_changepoint: bool,
    scoring_changepoint_direction: Option<String>,
    scoring_changepoint_magnitude: Option<f64>,
    scoring_consistency: Option<f64>,
    game_profile: Option<String>,
    avg_total_points: Option<f64>,
}

impl TeamStatsRow {
    fn into_stats(self) -> TeamStats {
        let ppg_scored = self.ppg_scored.unwrap_or(LEAGUE_AVG_PPG);
        let ppg_allowed = self.ppg_allowed.unwrap_or(LEAGUE_AVG_PPG);
        // Recent form falls back to the season averages, so downstream
        // blending degrades to the plain season differential.
        let last_5_ppg = self.last_5_ppg.unwrap_or(ppg_scored);
        let last_5_ppg_allowed = self.last_5_ppg_allowed.unwrap_or(ppg_allowed);

        let changepoint = if self.scoring_changepoint {
            let direction = match self.scoring_changepoint_direction.as_deref() {
                Some("up") => Some(TrendDirection::Up),
                Some("down") => Some(TrendDirection::Down),
                _ => None,
            };
            direction.map(|direction| Changepoint {
                direction,
                magnitude: self.scoring_changepoint_magnitude.unwrap_or(0.0),
            })
        } else {
            None
        };

        let game_profile = match self.game_profile.as_deref() {
            Some("fast_starter") => GameProfile::FastStarter,
            Some("closer") => GameProfile::Closer,
            _ => GameProfile::Balanced,
        };

        TeamStats {
            team_code: self.team_code,
            season: self.season,
            games_played: self.games_played.unwrap_or(0),
            wins: self.wins.unwrap_or(0),
            losses: self.losses.unwrap_or(0),
            ties: self.ties.unwrap_or(0),
            ppg_scored,
            ppg_allowed,
            last_5_ppg,
            last_5_ppg_allowed,
            scoring_std_dev: self.scoring_std_dev.unwrap_or(LEAGUE_SCORING_STD_DEV),
            ema_differential: self
                .ema_differential
                .unwrap_or(ppg_scored - ppg_allowed),
            changepoint,
            scoring_consistency: self.scoring_consistency.unwrap_or(LEAGUE_AVG_CONSISTENCY),
            game_profile,
            avg_total_points: self.avg_total_points.unwrap_or(LEAGUE_AVG_TOTAL_POINTS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upcoming(season: i32, week: u32, date: &str, home: &str, away: &str) -> Game {
        Game {
            season,
            week,
            game_date: Some(date.to_string()),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_score: None,
            away_score: None,
            home_first_half: None,
            home_second_half: None,
            away_first_half: None,
            away_second_half: None,
            is_completed: false,
        }
    }

    #[test]
    fn missing_team_resolves_to_none() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_team_stats("KC", 2025).unwrap().is_none());
    }

    #[test]
    fn team_stats_round_trip_through_the_db() {
        let store = Store::open_in_memory().unwrap();
        let mut stats = TeamStats::league_average("KC", 2025);
        stats.games_played = 10;
        stats.wins = 8;
        stats.losses = 2;
        stats.ppg_scored = 27.4;
        stats.ppg_allowed = 19.1;
        stats.last_5_ppg = 30.2;
        stats.last_5_ppg_allowed = 17.8;
        stats.ema_differential = 9.6;
        stats.changepoint = Some(Changepoint {
            direction: TrendDirection::Up,
            magnitude: 6.3,
        });
        stats.game_profile = GameProfile::Closer;
        store.upsert_team_stats(&stats).unwrap();

        let loaded = store.get_team_stats("KC", 2025).unwrap().unwrap();
        assert_eq!(loaded.ppg_scored, 27.4);
        assert_eq!(loaded.last_5_ppg, 30.2);
        assert_eq!(loaded.game_profile, GameProfile::Closer);
        let cp = loaded.changepoint.unwrap();
        assert_eq!(cp.direction, TrendDirection::Up);
        assert_eq!(cp.magnitude, 6.3);

        // Upsert replaces rather than duplicating.
        stats.ppg_scored = 28.0;
        store.upsert_team_stats(&stats).unwrap();
        let loaded = store.get_team_stats("KC", 2025).unwrap().unwrap();
        assert_eq!(loaded.ppg_scored, 28.0);
    }

    #[test]
    fn upcoming_matchups_filter_and_order() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_game(&Game {
                home_score: Some(24),
                away_score: Some(20),
                is_completed: true,
                ..upcoming(2025, 1, "2025-09-07", "KC", "BAL")
            })
            .unwrap();
        store
            .insert_game(&upcoming(2025, 2, "2025-09-14", "KC", "CIN"))
            .unwrap();
        store
            .insert_game(&upcoming(2025, 2, "2025-09-15", "SF", "LAR"))
            .unwrap();
        store
            .insert_game(&upcoming(2025, 3, "2025-09-21", "DET", "GB"))
            .unwrap();
        store
            .insert_game(&upcoming(2024, 2, "2024-09-15", "NYJ", "NE"))
            .unwrap();

        let all = store.get_upcoming_matchups(2025, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].home_team, "KC");
        assert_eq!(all[2].home_team, "DET");

        let week2 = store.get_upcoming_matchups(2025, Some(2)).unwrap();
        assert_eq!(week2.len(), 2);
        assert!(week2.iter().all(|g| g.week == 2 && !g.is_completed));
    }

    #[test]
    fn null_columns_fall_back_to_league_defaults() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO team_stats (team_code, season, ppg_scored) VALUES ('CAR', 2025, 17.5)",
                [],
            )
            .unwrap();
        let stats = store.get_team_stats("CAR", 2025).unwrap().unwrap();
        assert_eq!(stats.ppg_scored, 17.5);
        assert_eq!(stats.ppg_allowed, LEAGUE_AVG_PPG);
        // Last-5 falls back to the season value, not the league average.
        assert_eq!(stats.last_5_ppg, 17.5);
        assert_eq!(stats.scoring_std_dev, LEAGUE_SCORING_STD_DEV);
        assert_eq!(stats.scoring_consistency, LEAGUE_AVG_CONSISTENCY);
        assert_eq!(stats.avg_total_points, LEAGUE_AVG_TOTAL_POINTS);
        assert_eq!(stats.game_profile, GameProfile::Balanced);
        assert!(stats.changepoint.is_none());
        assert_eq!(stats.ema_differential, 17.5 - LEAGUE_AVG_PPG);
    }
}
