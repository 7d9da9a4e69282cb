//! The "current vibe" badge shown next to the conversation.

use super::label::SentimentLabel;
use std::fmt;

/// Scores at or beyond this magnitude tint the badge.
pub const MOOD_THRESHOLD: f64 = 0.05;

/// Mood of the latest user turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoodBadge {
    /// No user turn has been scored yet.
    Waiting,
    Scored { label: SentimentLabel, score: f64 },
}

impl MoodBadge {
    /// Derives the badge from the last score in the series.
    pub fn from_scores(scores: &[f64]) -> Self {
        match scores.last() {
            None => MoodBadge::Waiting,
            Some(&score) => {
                let label = if score >= MOOD_THRESHOLD {
                    SentimentLabel::Positive
                } else if score <= -MOOD_THRESHOLD {
                    SentimentLabel::Negative
                } else {
                    SentimentLabel::Neutral
                };
                MoodBadge::Scored { label, score }
            }
        }
    }

    pub fn label(&self) -> Option<SentimentLabel> {
        match self {
            MoodBadge::Waiting => None,
            MoodBadge::Scored { label, .. } => Some(*label),
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self.label() {
            Some(SentimentLabel::Positive) => "😊",
            Some(SentimentLabel::Negative) => "😡",
            _ => "😐",
        }
    }
}

impl fmt::Display for MoodBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoodBadge::Waiting => write!(f, "Waiting for input..."),
            MoodBadge::Scored { label, score } => write!(f, "{} ({:.2})", label, score),
        }
    }
}
