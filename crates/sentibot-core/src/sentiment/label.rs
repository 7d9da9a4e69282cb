use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Polarity assigned to a single user turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

/// Class probabilities produced by a three-way sentiment model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    pub negative: f32,
    pub neutral: f32,
    pub positive: f32,
}

impl ClassProbabilities {
    pub fn new(negative: f32, neutral: f32, positive: f32) -> Self {
        Self {
            negative,
            neutral,
            positive,
        }
    }

    /// The most probable class.
    ///
    /// Ties resolve towards the later class in `negative, neutral, positive`
    /// order.
    pub fn top(&self) -> SentimentLabel {
        let ranked = [
            (SentimentLabel::Negative, self.negative),
            (SentimentLabel::Neutral, self.neutral),
            (SentimentLabel::Positive, self.positive),
        ];
        let mut best = ranked[0];
        for candidate in &ranked[1..] {
            if candidate.1 >= best.1 {
                best = *candidate;
            }
        }
        best.0
    }
}

/// Outcome of classifying one piece of text.
///
/// `score` is signed: negative sentiment maps to `[-1, 0)`, positive to
/// `(0, 1]`, and neutral is always exactly `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub score: f64,
    pub label: SentimentLabel,
}

impl SentimentAnalysis {
    /// The safe default used whenever classification is not possible.
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
        }
    }

    /// Applies the signed score policy to the winning class.
    pub fn from_probabilities(probs: &ClassProbabilities) -> Self {
        match probs.top() {
            SentimentLabel::Negative => Self {
                score: -f64::from(probs.negative),
                label: SentimentLabel::Negative,
            },
            SentimentLabel::Positive => Self {
                score: f64::from(probs.positive),
                label: SentimentLabel::Positive,
            },
            SentimentLabel::Neutral => Self::neutral(),
        }
    }
}
