use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, types::Type, Connection, Row};
use uuid::Uuid;

use super::{Result, TrainingRepository};
use crate::history::SessionHistory;
use crate::preset::Preset;
use crate::session::{Attempt, TrainingMode};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS exercises (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        mode TEXT NOT NULL,
        default_target REAL NOT NULL,
        default_rest_time INTEGER NOT NULL,
        default_adjustment REAL NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        preset_id TEXT NOT NULL,
        exercise_name TEXT NOT NULL,
        mode TEXT NOT NULL,
        target REAL NOT NULL,
        rest_time INTEGER NOT NULL,
        adjustment REAL NOT NULL,
        total_accumulated REAL NOT NULL,
        session_duration INTEGER NOT NULL,
        attempt_count INTEGER NOT NULL,
        completed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_ref TEXT NOT NULL,
        attempt_number INTEGER NOT NULL,
        value REAL NOT NULL,
        adjustment REAL NOT NULL,
        total_counted REAL NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_preset ON sessions(preset_id);
    CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);
    CREATE INDEX IF NOT EXISTS idx_attempts_session ON attempts(session_ref);
"#;

const SESSION_COLUMNS: &str = "id, preset_id, exercise_name, mode, target, rest_time, adjustment, \
     total_accumulated, session_duration, attempt_count, completed_at";

/// Presets and histories in the exercises/sessions/attempts table layout
#[derive(Debug)]
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open (or create) the database file and make sure the tables exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn attempts_for(&self, session_id: &str) -> rusqlite::Result<Vec<Attempt>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT value, adjustment, total_counted, timestamp
            FROM attempts
            WHERE session_ref = ?1
            ORDER BY attempt_number ASC
            "#,
        )?;

        let rows = stmt.query_map([session_id], |row| {
            Ok(Attempt {
                raw_value: row.get(0)?,
                adjustment: row.get(1)?,
                counted_value: row.get(2)?,
                timestamp: parse_time(row, 3)?,
            })
        })?;

        rows.collect()
    }

    fn query_histories(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<SessionHistory>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, session_from_row)?;

        let mut histories = Vec::new();
        for row in rows {
            let mut history = row?;
            history.attempts = self.attempts_for(&history.id.to_string())?;
            histories.push(history);
        }
        Ok(histories)
    }
}

impl TrainingRepository for SqliteRepository {
    fn presets(&self) -> Result<Vec<Preset>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, mode, default_target, default_rest_time, default_adjustment, created_at
            FROM exercises
            ORDER BY created_at ASC, rowid ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Preset {
                id: parse_uuid(row, 0)?,
                name: row.get(1)?,
                mode: parse_mode(row, 2)?,
                target: row.get(3)?,
                rest_seconds: row.get(4)?,
                adjustment: row.get(5)?,
                created_at: parse_time(row, 6)?,
            })
        })?;

        let mut presets = Vec::new();
        for preset in rows {
            presets.push(preset?);
        }
        Ok(presets)
    }

    fn save_preset(&mut self, preset: &Preset) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO exercises
            (id, name, mode, default_target, default_rest_time, default_adjustment, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                mode = excluded.mode,
                default_target = excluded.default_target,
                default_rest_time = excluded.default_rest_time,
                default_adjustment = excluded.default_adjustment
            "#,
            params![
                preset.id.to_string(),
                preset.name,
                preset.mode.to_string(),
                preset.target,
                preset.rest_seconds,
                preset.adjustment,
                preset.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_preset(&mut self, id: Uuid) -> Result<()> {
        let id = id.to_string();
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM attempts WHERE session_ref IN (SELECT id FROM sessions WHERE preset_id = ?1)",
            [&id],
        )?;
        tx.execute("DELETE FROM sessions WHERE preset_id = ?1", [&id])?;
        tx.execute("DELETE FROM exercises WHERE id = ?1", [&id])?;
        tx.commit()?;
        Ok(())
    }

    fn save_history(&mut self, history: &SessionHistory) -> Result<()> {
        let session_id = history.id.to_string();
        let tx = self.conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO sessions ({SESSION_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                session_id,
                history.preset_id.to_string(),
                history.exercise_name,
                history.mode.to_string(),
                history.target,
                history.rest_seconds,
                history.adjustment,
                history.accumulated_total,
                history.duration_seconds as i64,
                history.attempt_count as i64,
                history.date.to_rfc3339(),
            ],
        )?;

        for (idx, attempt) in history.attempts.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO attempts
                (session_ref, attempt_number, value, adjustment, total_counted, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    session_id,
                    (idx + 1) as i64,
                    attempt.raw_value,
                    attempt.adjustment,
                    attempt.counted_value,
                    attempt.timestamp.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        debug!("stored session {session_id} with {} attempts", history.attempts.len());
        Ok(())
    }

    fn histories(&self, preset_id: Uuid) -> Result<Vec<SessionHistory>> {
        self.query_histories(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE preset_id = ?1 ORDER BY completed_at DESC"
            ),
            &[&preset_id.to_string()],
        )
    }

    fn all_histories(&self) -> Result<Vec<SessionHistory>> {
        self.query_histories(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY completed_at ASC"),
            &[],
        )
    }

    fn delete_history(&mut self, id: Uuid) -> Result<()> {
        let id = id.to_string();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM attempts WHERE session_ref = ?1", [&id])?;
        tx.execute("DELETE FROM sessions WHERE id = ?1", [&id])?;
        tx.commit()?;
        Ok(())
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionHistory> {
    let duration: i64 = row.get(8)?;
    let attempt_count: i64 = row.get(9)?;
    Ok(SessionHistory {
        id: parse_uuid(row, 0)?,
        preset_id: parse_uuid(row, 1)?,
        exercise_name: row.get(2)?,
        mode: parse_mode(row, 3)?,
        target: row.get(4)?,
        rest_seconds: row.get(5)?,
        adjustment: row.get(6)?,
        accumulated_total: row.get(7)?,
        duration_seconds: duration.max(0) as u64,
        attempt_count: attempt_count.max(0) as usize,
        date: parse_time(row, 10)?,
        attempts: Vec::new(),
    })
}

fn parse_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_mode(row: &Row<'_>, idx: usize) -> rusqlite::Result<TrainingMode> {
    let raw: String = row.get(idx)?;
    raw.parse::<TrainingMode>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
