//! Sentiment scoring with a fail-open policy.

use super::label::{SentimentAnalysis, SentimentLabel};
use super::model::SentimentModel;
use crate::error::{Result, SentibotError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Display;

/// Slang the model tends to rate as neutral even though it is clearly upbeat.
pub const OVERRIDE_PHRASE: &str = "fuck yeah";

/// Score forced onto texts containing [`OVERRIDE_PHRASE`].
pub const OVERRIDE_SCORE: f64 = 0.9;

static OVERRIDE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("(?i){}", regex::escape(OVERRIDE_PHRASE)))
        .expect("hardcoded regex is valid")
});

/// Maps text to a signed sentiment score.
///
/// Never fails: when the model is missing or inference errors out, the result
/// is `{score: 0.0, label: Neutral}` and the error is only logged.
pub struct SentimentAnalyzer {
    model: Option<Box<dyn SentimentModel>>,
}

impl SentimentAnalyzer {
    pub fn new(model: Box<dyn SentimentModel>) -> Self {
        tracing::info!("Sentiment model ready: {}", model.name());
        Self { model: Some(model) }
    }

    /// An analyzer whose model failed to load. Every text scores as neutral.
    pub fn unavailable(reason: impl Display) -> Self {
        tracing::warn!("Sentiment model unavailable, scoring everything as neutral: {}", reason);
        Self { model: None }
    }

    /// Wraps the outcome of a model load.
    pub fn from_load<M, E>(result: std::result::Result<M, E>) -> Self
    where
        M: SentimentModel + 'static,
        E: Display,
    {
        match result {
            Ok(model) => Self::new(Box::new(model)),
            Err(e) => Self::unavailable(e),
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    /// Classifies `text`.
    pub fn analyze(&self, text: &str) -> SentimentAnalysis {
        match self.try_analyze(text) {
            Ok(analysis) => {
                tracing::debug!(
                    label = %analysis.label,
                    score = analysis.score,
                    "Classified user turn"
                );
                analysis
            }
            Err(e) => {
                tracing::warn!("Analysis error, falling back to neutral: {}", e);
                SentimentAnalysis::neutral()
            }
        }
    }

    fn try_analyze(&self, text: &str) -> Result<SentimentAnalysis> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| SentibotError::model_unavailable("classifier was not loaded"))?;

        let probs = model.predict(text)?;
        let analysis = SentimentAnalysis::from_probabilities(&probs);

        if analysis.label == SentimentLabel::Neutral && OVERRIDE_PATTERN.is_match(text) {
            return Ok(SentimentAnalysis {
                score: OVERRIDE_SCORE,
                label: SentimentLabel::Positive,
            });
        }

        Ok(analysis)
    }
}
