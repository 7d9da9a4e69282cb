//! In-memory state of the active conversation.

use sentibot_core::session::{SessionRecord, Turn};
use sentibot_core::sentiment::MoodBadge;

/// The conversation the user is currently having.
///
/// Owned by the caller of [`ChatUseCase`](crate::ChatUseCase) and passed by
/// reference into each operation. Nothing else mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSession {
    record: SessionRecord,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resumes a persisted conversation.
    pub fn from_record(record: SessionRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn turns(&self) -> &[Turn] {
        self.record.turns()
    }

    pub fn scores(&self) -> &[f64] {
        self.record.scores()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    /// Badge for the most recent user turn.
    pub fn mood(&self) -> MoodBadge {
        MoodBadge::from_scores(self.record.scores())
    }

    pub(crate) fn record_mut(&mut self) -> &mut SessionRecord {
        &mut self.record
    }

    pub(crate) fn replace(&mut self, record: SessionRecord) {
        self.record = record;
    }

    pub(crate) fn reset(&mut self) {
        self.record.clear();
    }
}
