//! Session store trait.
//!
//! Defines the interface for persisting chat sessions.

use super::record::SessionRecord;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract store for finished or in-progress chat sessions.
///
/// Each session lives under its own name in a flat namespace. There is no
/// locking: saving twice under the same name keeps the last write.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Saves a session under a freshly generated, timestamp-based name.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(name))`: Session written under `name`
    /// - `Ok(None)`: Nothing to save (the record has no turns)
    /// - `Err(_)`: The session directory or file could not be written
    async fn save(&self, record: &SessionRecord) -> Result<Option<String>>;

    /// Loads the session stored under `name`.
    ///
    /// # Returns
    ///
    /// - `Ok(SessionRecord)`: Session found and parsed
    /// - `Err(SentibotError::NotFound)`: No session with that name
    /// - `Err(_)`: Error occurred during retrieval
    async fn load(&self, name: &str) -> Result<SessionRecord>;

    /// Lists stored session names, most recent first.
    async fn list(&self) -> Result<Vec<String>>;
}
