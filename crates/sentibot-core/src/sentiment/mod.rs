//! Sentiment classification domain.

pub mod analyzer;
pub mod label;
pub mod model;
pub mod mood;

pub use analyzer::{OVERRIDE_PHRASE, OVERRIDE_SCORE, SentimentAnalyzer};
pub use label::{ClassProbabilities, SentimentAnalysis, SentimentLabel};
pub use model::SentimentModel;
pub use mood::{MOOD_THRESHOLD, MoodBadge};
