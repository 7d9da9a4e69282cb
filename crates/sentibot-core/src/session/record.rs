//! The persisted shape of one chat session.

use super::message::{Role, Turn};
use serde::{Deserialize, Serialize};

/// Ordered turns plus one sentiment score per user turn.
///
/// On disk this is `{"messages": [...], "scores": [...]}`. Files written before
/// scores were tracked have no `scores` field; they load with an empty series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "messages")]
    turns: Vec<Turn>,
    #[serde(default)]
    scores: Vec<f64>,
}

impl SessionRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from already collected turns and scores.
    pub fn from_parts(turns: Vec<Turn>, scores: Vec<f64>) -> Self {
        Self { turns, scores }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Score series, parallel-indexed to the user turns.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// True when no turn has been recorded. Scores are not considered.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push_user_turn(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    pub fn push_assistant_turn(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::assistant(content));
    }

    pub fn push_score(&mut self, score: f64) {
        self.scores.push(score);
    }

    /// Number of turns authored by the user.
    pub fn user_turn_count(&self) -> usize {
        self.turns.iter().filter(|t| t.role() == Role::User).count()
    }

    /// Whether every user turn has exactly one score.
    ///
    /// Legacy files and a turn still being classified are the two cases where
    /// this does not hold.
    pub fn is_aligned(&self) -> bool {
        self.scores.len() == self.user_turn_count()
    }

    /// Score of the most recent user turn.
    pub fn last_score(&self) -> Option<f64> {
        self.scores.last().copied()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.scores.clear();
    }
}
