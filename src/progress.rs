use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::error::ExportError;
use crate::session::Preset;

/// XP granted for finishing a breathing session
pub const XP_PER_SESSION: u32 = 80;
/// Progress percentage gained per session, capped at 100
pub const PROGRESS_PER_SESSION: u32 = 5;

const CSV_HEADER: [&str; 6] = [
    "preset",
    "cycles",
    "final_score",
    "attempts",
    "raw_points",
    "completed_at",
];

/// A finished session as stored in the history table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedSession {
    pub preset: String,
    pub cycles: u32,
    pub final_score: u8,
    pub attempts: u32,
    pub raw_points: u32,
    pub completed_at: DateTime<Local>,
}

impl CompletedSession {
    pub fn new(
        preset: Option<Preset>,
        cycles: u32,
        final_score: u8,
        attempts: u32,
        raw_points: u32,
    ) -> Self {
        Self {
            preset: preset.map_or_else(|| "custom".to_string(), |p| p.to_string()),
            cycles,
            final_score,
            attempts,
            raw_points,
            completed_at: Local::now(),
        }
    }
}

/// Lifetime progress for the breathing game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameProgress {
    pub high_score: u8,
    pub times_played: u32,
    /// 0..=100
    pub progress: u32,
    pub xp: u32,
}

impl GameProgress {
    fn from_counts(high_score: u8, times_played: u32) -> Self {
        Self {
            high_score,
            times_played,
            progress: (times_played.saturating_mul(PROGRESS_PER_SESSION)).min(100),
            xp: times_played.saturating_mul(XP_PER_SESSION),
        }
    }
}

/// SQLite store for completed sessions
#[derive(Debug)]
pub struct ProgressDb {
    conn: Connection,
}

impl ProgressDb {
    /// Open the database at the default state location
    pub fn new() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("breathr_progress.db"));
        Self::open(path)
    }

    /// Open (creating if needed) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS breath_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                preset TEXT NOT NULL,
                cycles INTEGER NOT NULL,
                final_score INTEGER NOT NULL,
                attempts INTEGER NOT NULL,
                raw_points INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_breath_sessions_completed ON breath_sessions(completed_at)",
            [],
        )?;

        Ok(ProgressDb { conn })
    }

    pub fn record_session(&self, session: &CompletedSession) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO breath_sessions
            (preset, cycles, final_score, attempts, raw_points, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                session.preset,
                session.cycles,
                session.final_score,
                session.attempts,
                session.raw_points,
                session.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn summary(&self) -> Result<GameProgress> {
        self.conn.query_row(
            "SELECT COALESCE(MAX(final_score), 0), COUNT(*) FROM breath_sessions",
            [],
            |row| {
                let high: u8 = row.get(0)?;
                let played: u32 = row.get(1)?;
                Ok(GameProgress::from_counts(high, played))
            },
        )
    }

    /// Most recent sessions first
    pub fn recent(&self, limit: usize) -> Result<Vec<CompletedSession>> {
        self.load(true, i64::try_from(limit).unwrap_or(i64::MAX))
    }

    fn load(&self, newest_first: bool, limit: i64) -> Result<Vec<CompletedSession>> {
        let order = if newest_first { "DESC" } else { "ASC" };
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT preset, cycles, final_score, attempts, raw_points, completed_at
            FROM breath_sessions
            ORDER BY id {order}
            LIMIT ?1
            "#
        ))?;

        let rows = stmt.query_map(params![limit], |row| {
            let completed_at: String = row.get(5)?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map(|dt| dt.with_timezone(&Local))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
            Ok(CompletedSession {
                preset: row.get(0)?,
                cycles: row.get(1)?,
                final_score: row.get(2)?,
                attempts: row.get(3)?,
                raw_points: row.get(4)?,
                completed_at,
            })
        })?;

        rows.collect()
    }

    /// Write the whole history, oldest first, as CSV. Returns the row count.
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> std::result::Result<usize, ExportError> {
        // a negative LIMIT means no limit in SQLite
        let sessions = self.load(false, -1)?;

        let mut writer = csv::Writer::from_path(path)?;
        if sessions.is_empty() {
            writer.write_record(CSV_HEADER)?;
        }
        for session in &sessions {
            writer.serialize(session)?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(sessions.len())
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM breath_sessions", [])?;
        Ok(())
    }
}

/// Record a session if a database is available, logging failures.
pub fn record_best_effort(db: Option<&ProgressDb>, session: &CompletedSession) {
    if let Some(db) = db {
        if let Err(err) = db.record_session(session) {
            warn!(error = %err, "failed to record breathing session");
        }
    }
}
