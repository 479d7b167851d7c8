// SQLite persistence: roster queries, reference-data lookups, and the
// one-transaction-per-sheet commit.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::draft::pick::DraftPick;
use crate::roster::Candidate;

/// A team ready to be written, together with its picks. `picks` carry the
/// final overall numbers; `team_id` is assigned at insert time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRecord {
    pub season_id: i64,
    pub captain_id: i64,
    pub division_id: i64,
    pub name: String,
    /// 1-based column/draft position within the division.
    pub team_number: u32,
    pub picks: Vec<PlannedPick>,
}

/// A pick before its team row exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedPick {
    pub user_id: i64,
    pub round: u32,
    pub overall: u32,
}

/// What a committed sheet produced, for reporting and the audit log.
#[derive(Debug, Clone)]
pub struct CommitSummary {
    pub team_ids: Vec<i64>,
    pub pick_count: usize,
}

/// Sheet provenance written to the audit log alongside a commit.
#[derive(Debug, Clone)]
pub struct SheetAudit {
    pub source: String,
    pub season: String,
    pub year: u32,
    pub division: String,
}

/// SQLite-backed persistence for users, seasons, divisions, teams, and
/// draft picks.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name     TEXT NOT NULL,
                last_name      TEXT NOT NULL,
                preferred_name TEXT
            );

            CREATE TABLE IF NOT EXISTS seasons (
                id   INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                year INTEGER NOT NULL,
                UNIQUE(name, year)
            );

            CREATE TABLE IF NOT EXISTS divisions (
                id    INTEGER PRIMARY KEY AUTOINCREMENT,
                name  TEXT NOT NULL UNIQUE,
                level INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS teams (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                season_id   INTEGER NOT NULL REFERENCES seasons(id),
                captain_id  INTEGER NOT NULL REFERENCES users(id),
                division_id INTEGER NOT NULL REFERENCES divisions(id),
                name        TEXT NOT NULL,
                team_number INTEGER NOT NULL,
                UNIQUE(season_id, division_id, team_number)
            );

            CREATE TABLE IF NOT EXISTS draft_picks (
                team_id INTEGER NOT NULL REFERENCES teams(id),
                user_id INTEGER NOT NULL REFERENCES users(id),
                round   INTEGER NOT NULL,
                overall INTEGER NOT NULL,
                PRIMARY KEY (team_id, round)
            );

            CREATE TABLE IF NOT EXISTS import_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                source      TEXT NOT NULL,
                season      TEXT NOT NULL,
                year        INTEGER NOT NULL,
                division    TEXT NOT NULL,
                team_count  INTEGER NOT NULL,
                pick_count  INTEGER NOT NULL,
                detail      TEXT,
                imported_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Roster and reference data (read-only collaborators)
    // ------------------------------------------------------------------

    /// Load the full league roster, ordered by id for deterministic
    /// prompt numbering.
    pub fn load_roster(&self) -> Result<Vec<Candidate>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, first_name, last_name, preferred_name FROM users ORDER BY id")
            .context("failed to prepare roster query")?;

        let roster = stmt
            .query_map([], |row| {
                Ok(Candidate {
                    id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    preferred_name: row.get(3)?,
                })
            })
            .context("failed to query roster")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster rows")?;

        Ok(roster)
    }

    /// Resolve a `(season name, year)` pair to its id. `None` means the
    /// season is missing from reference data and must be created by an
    /// administrator before the sheet can import.
    pub fn lookup_season(&self, name: &str, year: u32) -> Result<Option<i64>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id FROM seasons WHERE name = ?1 AND year = ?2",
            params![name, year],
            |row| row.get(0),
        )
        .optional()
        .context("failed to look up season")
    }

    /// Resolve a division name to `(id, level)`. Case-insensitive, since
    /// sheet filenames are inconsistent about casing.
    pub fn lookup_division(&self, name: &str) -> Result<Option<(i64, u32)>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, level FROM divisions WHERE name = ?1 COLLATE NOCASE",
            params![name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .context("failed to look up division")
    }

    // ------------------------------------------------------------------
    // Per-sheet commit
    // ------------------------------------------------------------------

    /// Write a resolved sheet's teams, picks, and audit row as a single
    /// transaction. Either every row lands, or nothing does -- a partially
    /// resolved sheet must never produce a partially committed team, and a
    /// committed sheet always has its audit entry.
    pub fn commit_sheet(&self, teams: &[TeamRecord], audit: &SheetAudit) -> Result<CommitSummary> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin sheet transaction")?;

        let mut team_ids = Vec::with_capacity(teams.len());
        let mut pick_count = 0usize;

        for team in teams {
            let team_id: i64 = tx
                .query_row(
                    "INSERT INTO teams (season_id, captain_id, division_id, name, team_number)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     RETURNING id",
                    params![
                        team.season_id,
                        team.captain_id,
                        team.division_id,
                        team.name,
                        team.team_number,
                    ],
                    |row| row.get(0),
                )
                .with_context(|| format!("failed to insert team `{}`", team.name))?;

            for pick in &team.picks {
                tx.execute(
                    "INSERT INTO draft_picks (team_id, user_id, round, overall)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![team_id, pick.user_id, pick.round, pick.overall],
                )
                .with_context(|| {
                    format!("failed to insert round {} pick for `{}`", pick.round, team.name)
                })?;
                pick_count += 1;
            }

            team_ids.push(team_id);
        }

        let detail =
            serde_json::to_string(teams).context("failed to serialize import detail")?;
        tx.execute(
            "INSERT INTO import_log (source, season, year, division, team_count, pick_count, detail)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                audit.source,
                audit.season,
                audit.year,
                audit.division,
                teams.len(),
                pick_count,
                detail
            ],
        )
        .context("failed to record import")?;

        tx.commit().context("failed to commit sheet transaction")?;

        Ok(CommitSummary {
            team_ids,
            pick_count,
        })
    }

    /// Load all picks for a team, ordered by round. Used for verification
    /// and reporting, not by the import path itself.
    pub fn load_picks(&self, team_id: i64) -> Result<Vec<DraftPick>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT team_id, user_id, round, overall
                 FROM draft_picks WHERE team_id = ?1 ORDER BY round",
            )
            .context("failed to prepare pick query")?;

        let picks = stmt
            .query_map(params![team_id], |row| {
                Ok(DraftPick {
                    team_id: row.get(0)?,
                    user_id: row.get(1)?,
                    round: row.get(2)?,
                    overall: row.get(3)?,
                })
            })
            .context("failed to query picks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map pick rows")?;

        Ok(picks)
    }

    // ------------------------------------------------------------------
    // Reference-data seeding (tests, initial setup)
    // ------------------------------------------------------------------

    pub fn add_user(
        &self,
        first_name: &str,
        last_name: &str,
        preferred_name: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "INSERT INTO users (first_name, last_name, preferred_name)
             VALUES (?1, ?2, ?3) RETURNING id",
            params![first_name, last_name, preferred_name],
            |row| row.get(0),
        )
        .context("failed to insert user")
    }

    pub fn add_season(&self, name: &str, year: u32) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "INSERT INTO seasons (name, year) VALUES (?1, ?2) RETURNING id",
            params![name, year],
            |row| row.get(0),
        )
        .context("failed to insert season")
    }

    pub fn add_division(&self, name: &str, level: u32) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "INSERT INTO divisions (name, level) VALUES (?1, ?2) RETURNING id",
            params![name, level],
            |row| row.get(0),
        )
        .context("failed to insert division")
    }
}
