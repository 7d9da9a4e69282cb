use super::label::ClassProbabilities;
use crate::error::Result;

/// A pretrained three-way (negative / neutral / positive) text classifier.
///
/// Implementations do the tokenization and inference; the scoring policy lives
/// in [`SentimentAnalyzer`](super::SentimentAnalyzer).
pub trait SentimentModel: Send + Sync {
    /// Identifier of the underlying model artifact.
    fn name(&self) -> &str;

    /// Runs `text` through the model and returns softmaxed class probabilities.
    fn predict(&self, text: &str) -> Result<ClassProbabilities>;
}
