//! JSON file-backed SessionStore implementation.
//!
//! Directory structure:
//! ```text
//! sessions_dir/
//! ├── chat_2024-05-01_09-30-12.json
//! └── chat_2024-05-01_10-02-45.json
//! ```

use crate::paths::SentibotPaths;
use crate::storage::write_atomic;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use sentibot_core::session::{SessionRecord, SessionStore};
use sentibot_core::{Result, SentibotError};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

pub const SESSION_FILE_PREFIX: &str = "chat_";
pub const SESSION_FILE_SUFFIX: &str = ".json";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Builds the file name for a session saved at `at` (second precision).
pub fn session_file_name(at: &DateTime<Local>) -> String {
    format!(
        "{}{}{}",
        SESSION_FILE_PREFIX,
        at.format(TIMESTAMP_FORMAT),
        SESSION_FILE_SUFFIX
    )
}

fn is_session_file_name(name: &str) -> bool {
    name.starts_with(SESSION_FILE_PREFIX) && name.ends_with(SESSION_FILE_SUFFIX)
}

/// Stores one pretty-printed JSON file per session in a flat directory.
///
/// The directory is created lazily on the first save. Two saves within the
/// same second target the same file and the later one wins.
pub struct JsonSessionStore {
    sessions_dir: PathBuf,
}

impl JsonSessionStore {
    /// Creates a store rooted at `sessions_dir`. No I/O happens here.
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    /// Creates a store at the default location (`<config_dir>/sessions`).
    pub fn default_location() -> Result<Self> {
        let dir = SentibotPaths::sessions_dir()
            .map_err(|e| SentibotError::config(format!("Failed to get sessions directory: {}", e)))?;
        Ok(Self::new(dir))
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Saves `record` under the name derived from `at`.
    pub async fn save_at(
        &self,
        record: &SessionRecord,
        at: &DateTime<Local>,
    ) -> Result<Option<String>> {
        if record.is_empty() {
            tracing::debug!("Skipping save of empty session");
            return Ok(None);
        }

        let name = session_file_name(at);
        let path = self.sessions_dir.join(&name);
        let json = serde_json::to_vec_pretty(record)?;

        write_atomic(&path, &json).await?;
        tracing::info!(
            file = %name,
            turns = record.turns().len(),
            scores = record.scores().len(),
            "Saved session"
        );

        Ok(Some(name))
    }

    /// Resolves `name` inside the session directory, rejecting anything that
    /// is not a plain file name.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.sessions_dir.join(name)),
            _ => Err(SentibotError::invalid_input(format!(
                "'{}' is not a session file name",
                name
            ))),
        }
    }
}

#[async_trait]
impl SessionStore for JsonSessionStore {
    async fn save(&self, record: &SessionRecord) -> Result<Option<String>> {
        self.save_at(record, &Local::now()).await
    }

    async fn load(&self, name: &str) -> Result<SessionRecord> {
        let path = self.resolve(name)?;

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SentibotError::not_found("session", name));
            }
            Err(e) => return Err(e.into()),
        };

        let record: SessionRecord = serde_json::from_str(&content)?;
        if !record.is_aligned() {
            tracing::debug!(
                file = %name,
                user_turns = record.user_turn_count(),
                scores = record.scores().len(),
                "Loaded session whose scores do not cover every user turn"
            );
        }

        Ok(record)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.sessions_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_session_file_name(name) {
                    names.push(name.to_string());
                }
            }
        }

        // Most recent first
        names.sort_by(|a, b| b.cmp(a));
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sentibot_core::session::Turn;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    fn sample_record() -> SessionRecord {
        SessionRecord::from_parts(
            vec![
                Turn::user("my order never arrived"),
                Turn::assistant("I'm sorry about that."),
            ],
            vec![-0.82],
        )
    }

    #[test]
    fn test_session_file_name_format() {
        assert_eq!(session_file_name(&at(9, 5, 7)), "chat_2024-05-01_09-05-07.json");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path().join("sessions"));
        let record = sample_record();

        let name = store.save_at(&record, &at(9, 30, 0)).await.unwrap();
        assert_eq!(name.as_deref(), Some("chat_2024-05-01_09-30-00.json"));

        let loaded = store.load("chat_2024-05-01_09-30-00.json").await.unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_save_empty_record_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("sessions");
        let store = JsonSessionStore::new(&dir);

        let name = store.save(&SessionRecord::new()).await.unwrap();
        assert!(name.is_none());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_load_legacy_file_without_scores() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path());
        std::fs::write(
            temp_dir.path().join("chat_2023-01-01_00-00-00.json"),
            r#"{"messages": [{"role": "user", "content": "hi"}, {"role": "assistant", "content": "Hello! How can I help?"}]}"#,
        )
        .unwrap();

        let loaded = store.load("chat_2023-01-01_00-00-00.json").await.unwrap();
        assert!(loaded.scores().is_empty());
        assert_eq!(loaded.turns().len(), 2);
        assert_eq!(loaded.turns()[1].content(), "Hello! How can I help?");

        // Round trip keeps the messages and writes an explicit empty series
        let name = store.save_at(&loaded, &at(1, 0, 0)).await.unwrap().unwrap();
        let reloaded = store.load(&name).await.unwrap();
        assert_eq!(reloaded.turns(), loaded.turns());
        assert!(reloaded.scores().is_empty());
    }

    #[tokio::test]
    async fn test_same_second_save_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path());

        store.save_at(&sample_record(), &at(10, 0, 0)).await.unwrap();
        let second = SessionRecord::from_parts(vec![Turn::user("second")], vec![0.0]);
        store.save_at(&second, &at(10, 0, 0)).await.unwrap();

        let names = store.list().await.unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(store.load(&names[0]).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_list_is_most_recent_first_and_filters_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path());

        store.save_at(&sample_record(), &at(8, 0, 0)).await.unwrap();
        store.save_at(&sample_record(), &at(12, 0, 0)).await.unwrap();
        store.save_at(&sample_record(), &at(10, 0, 0)).await.unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();

        let names = store.list().await.unwrap();
        assert_eq!(
            names,
            vec![
                "chat_2024-05-01_12-00-00.json".to_string(),
                "chat_2024-05-01_10-00-00.json".to_string(),
                "chat_2024-05-01_08-00-00.json".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path().join("absent"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path());
        let err = store.load("chat_1999-01-01_00-00-00.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_load_rejects_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path());
        for name in ["../secret.json", "a/b.json", "..", ""] {
            let err = store.load(name).await.unwrap_err();
            assert!(
                matches!(err, SentibotError::InvalidInput(_)),
                "{name} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_load_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path());
        std::fs::write(temp_dir.path().join("chat_bad.json"), "{not json").unwrap();
        assert!(store.load("chat_bad.json").await.unwrap_err().is_serialization());
    }
}
