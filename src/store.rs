pub mod kv;
pub mod sqlite;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::SessionHistory;
use crate::preset::{default_presets, Preset};

pub use kv::{FileKeyValueStore, KeyValueStore, KvRepository, MemoryKeyValueStore};
pub use sqlite::SqliteRepository;

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Encode(serde_json::Error),
    Database(rusqlite::Error),
    Csv(csv::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "storage i/o failed: {e}"),
            Self::Encode(e) => write!(f, "could not encode records: {e}"),
            Self::Database(e) => write!(f, "database error: {e}"),
            Self::Csv(e) => write!(f, "csv export failed: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Database(e) => Some(e),
            Self::Csv(e) => Some(e),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e)
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Which backend holds presets and histories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StorageKind {
    /// JSON-encoded collections in a key-value directory
    #[default]
    Json,
    /// `exercises`/`sessions`/`attempts` tables in SQLite
    Sqlite,
}

/// Presets and session histories. Constructed by the caller and passed in.
pub trait TrainingRepository {
    fn presets(&self) -> Result<Vec<Preset>>;

    /// Insert, or replace the preset with the same id
    fn save_preset(&mut self, preset: &Preset) -> Result<()>;

    /// Remove a preset together with its histories
    fn delete_preset(&mut self, id: Uuid) -> Result<()>;

    fn save_history(&mut self, history: &SessionHistory) -> Result<()>;

    /// Histories for one preset, newest first
    fn histories(&self, preset_id: Uuid) -> Result<Vec<SessionHistory>>;

    fn all_histories(&self) -> Result<Vec<SessionHistory>>;

    fn delete_history(&mut self, id: Uuid) -> Result<()>;

    fn preset(&self, id: Uuid) -> Result<Option<Preset>> {
        Ok(self.presets()?.into_iter().find(|p| p.id == id))
    }

    fn preset_by_name(&self, name: &str) -> Result<Option<Preset>> {
        let name = name.trim();
        Ok(self
            .presets()?
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name)))
    }

    /// Seed the default catalogue when there are no presets. Returns true if seeded.
    fn ensure_default_presets(&mut self) -> Result<bool> {
        if !self.presets()?.is_empty() {
            return Ok(false);
        }
        for preset in default_presets() {
            self.save_preset(&preset)?;
        }
        info!("seeded default presets");
        Ok(true)
    }
}

/// Open the configured backend inside `data_dir`
pub fn open_repository(kind: StorageKind, data_dir: &Path) -> Result<Box<dyn TrainingRepository>> {
    std::fs::create_dir_all(data_dir)?;
    let repo: Box<dyn TrainingRepository> = match kind {
        StorageKind::Json => Box::new(KvRepository::new(FileKeyValueStore::new(data_dir))),
        StorageKind::Sqlite => Box::new(SqliteRepository::open(data_dir.join("accrue.db"))?),
    };
    info!("opened {kind} storage in {}", data_dir.display());
    Ok(repo)
}

/// Save a finished session without letting a failure reach the caller.
/// Returns whether the write succeeded.
pub fn record_completed(repo: &mut dyn TrainingRepository, history: &SessionHistory) -> bool {
    match repo.save_history(history) {
        Ok(()) => {
            info!(
                "saved session {} for '{}' ({} attempts, {}s)",
                history.id, history.exercise_name, history.attempt_count, history.duration_seconds
            );
            true
        }
        Err(e) => {
            error!("failed to save session {}: {e}", history.id);
            false
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionRow<'a> {
    id: String,
    exercise_name: &'a str,
    mode: String,
    target: f64,
    rest_time: i64,
    adjustment: f64,
    total_accumulated: f64,
    session_duration: u64,
    attempt_count: usize,
    completed_at: String,
}

#[derive(Debug, Serialize)]
struct AttemptRow {
    session_ref: String,
    attempt_number: usize,
    value: f64,
    adjustment: f64,
    total_counted: f64,
}

const SESSION_HEADERS: [&str; 10] = [
    "id",
    "exercise_name",
    "mode",
    "target",
    "rest_time",
    "adjustment",
    "total_accumulated",
    "session_duration",
    "attempt_count",
    "completed_at",
];

const ATTEMPT_HEADERS: [&str; 5] = [
    "session_ref",
    "attempt_number",
    "value",
    "adjustment",
    "total_counted",
];

/// Header rows are written up front so an empty export still names its columns
fn csv_writer(path: &Path, headers: &[&str]) -> Result<csv::Writer<std::fs::File>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(headers)?;
    Ok(writer)
}

/// Write `sessions.csv` and `attempts.csv` into `dir`
pub fn export_csv(histories: &[SessionHistory], dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let sessions_path = dir.join("sessions.csv");
    let attempts_path = dir.join("attempts.csv");

    let mut sessions = csv_writer(&sessions_path, &SESSION_HEADERS)?;
    let mut attempts = csv_writer(&attempts_path, &ATTEMPT_HEADERS)?;

    for history in histories {
        sessions.serialize(SessionRow {
            id: history.id.to_string(),
            exercise_name: &history.exercise_name,
            mode: history.mode.to_string(),
            target: history.target,
            rest_time: history.rest_seconds,
            adjustment: history.adjustment,
            total_accumulated: history.accumulated_total,
            session_duration: history.duration_seconds,
            attempt_count: history.attempt_count,
            completed_at: history.date.to_rfc3339(),
        })?;

        for (idx, attempt) in history.attempts.iter().enumerate() {
            attempts.serialize(AttemptRow {
                session_ref: history.id.to_string(),
                attempt_number: idx + 1,
                value: attempt.raw_value,
                adjustment: attempt.adjustment,
                total_counted: attempt.counted_value,
            })?;
        }
    }

    sessions.flush()?;
    attempts.flush()?;
    info!(
        "exported {} sessions to {}",
        histories.len(),
        dir.display()
    );
    Ok((sessions_path, attempts_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Attempt, TrainingMode};
    use chrono::Utc;
    use tempfile::tempdir;

    struct FailingRepository;

    impl TrainingRepository for FailingRepository {
        fn presets(&self) -> Result<Vec<Preset>> {
            Ok(Vec::new())
        }
        fn save_preset(&mut self, _preset: &Preset) -> Result<()> {
            Ok(())
        }
        fn delete_preset(&mut self, _id: Uuid) -> Result<()> {
            Ok(())
        }
        fn save_history(&mut self, _history: &SessionHistory) -> Result<()> {
            Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk full")))
        }
        fn histories(&self, _preset_id: Uuid) -> Result<Vec<SessionHistory>> {
            Ok(Vec::new())
        }
        fn all_histories(&self) -> Result<Vec<SessionHistory>> {
            Ok(Vec::new())
        }
        fn delete_history(&mut self, _id: Uuid) -> Result<()> {
            Ok(())
        }
    }

    fn sample_history() -> SessionHistory {
        let now = Utc::now();
        SessionHistory {
            id: Uuid::new_v4(),
            preset_id: Uuid::new_v4(),
            exercise_name: "Pull-ups".to_string(),
            mode: TrainingMode::Reps,
            date: now,
            accumulated_total: 23.0,
            target: 20.0,
            rest_seconds: 30,
            adjustment: 2.0,
            attempt_count: 2,
            duration_seconds: 95,
            attempts: vec![
                Attempt {
                    raw_value: 10.0,
                    adjustment: 2.0,
                    counted_value: 12.0,
                    timestamp: now,
                },
                Attempt {
                    raw_value: 9.0,
                    adjustment: 2.0,
                    counted_value: 11.0,
                    timestamp: now,
                },
            ],
        }
    }

    #[test]
    fn test_record_completed_swallows_failures() {
        let mut repo = FailingRepository;
        assert!(!record_completed(&mut repo, &sample_history()));
    }

    #[test]
    fn test_record_completed_reports_success() {
        let mut repo = KvRepository::new(MemoryKeyValueStore::default());
        let history = sample_history();
        assert!(record_completed(&mut repo, &history));
        assert_eq!(repo.all_histories().unwrap(), vec![history]);
    }

    #[test]
    fn test_ensure_default_presets_only_seeds_once() {
        let mut repo = KvRepository::new(MemoryKeyValueStore::default());
        assert!(repo.ensure_default_presets().unwrap());
        assert!(!repo.ensure_default_presets().unwrap());
        assert_eq!(repo.presets().unwrap().len(), 3);
    }

    #[test]
    fn test_preset_by_name_is_case_insensitive() {
        let mut repo = KvRepository::new(MemoryKeyValueStore::default());
        repo.ensure_default_presets().unwrap();
        let found = repo.preset_by_name(" pull-UPS ").unwrap().unwrap();
        assert_eq!(found.name, "Pull-ups");
        assert!(repo.preset_by_name("muscle-ups").unwrap().is_none());
    }

    #[test]
    fn test_export_csv_writes_both_tables() {
        let dir = tempdir().unwrap();
        let history = sample_history();
        let (sessions, attempts) = export_csv(&[history.clone()], dir.path()).unwrap();

        let sessions = std::fs::read_to_string(sessions).unwrap();
        let mut lines = sessions.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,exercise_name,mode,target,rest_time,adjustment,total_accumulated,session_duration,attempt_count,completed_at"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with(&format!("{},Pull-ups,reps,20.0,30,2.0,23.0,95,2,", history.id)));

        let attempts = std::fs::read_to_string(attempts).unwrap();
        let lines: Vec<&str> = attempts.lines().collect();
        assert_eq!(
            lines[0],
            "session_ref,attempt_number,value,adjustment,total_counted"
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], format!("{},2,9.0,2.0,11.0", history.id));
    }

    #[test]
    fn test_export_csv_without_sessions_keeps_headers() {
        let dir = tempdir().unwrap();
        let (sessions, attempts) = export_csv(&[], dir.path()).unwrap();

        assert_eq!(
            std::fs::read_to_string(sessions).unwrap(),
            format!("{}\n", SESSION_HEADERS.join(","))
        );
        assert_eq!(
            std::fs::read_to_string(attempts).unwrap(),
            "session_ref,attempt_number,value,adjustment,total_counted\n"
        );
    }

    #[test]
    fn test_open_repository_for_each_backend() {
        let dir = tempdir().unwrap();
        for kind in [StorageKind::Json, StorageKind::Sqlite] {
            let mut repo = open_repository(kind, &dir.path().join(kind.to_string())).unwrap();
            assert!(repo.ensure_default_presets().unwrap());
            assert_eq!(repo.presets().unwrap().len(), 3);
        }
    }
}
