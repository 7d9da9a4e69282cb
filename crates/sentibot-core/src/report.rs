//! Session summary: an overall verdict plus the direction the mood moved in.

use serde::Serialize;
use strum::Display;

/// Mean scores at or beyond this magnitude produce a polar verdict.
pub const VERDICT_THRESHOLD: f64 = 0.2;

/// Start-to-end mean differences strictly beyond this count as a shift.
pub const TREND_THRESHOLD: f64 = 0.3;

/// Categorical summary of the average sentiment of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum Verdict {
    #[strum(to_string = "Positive - Customer Satisfied")]
    Positive,
    #[strum(to_string = "Negative - Issues Unresolved")]
    Negative,
    #[strum(to_string = "Neutral - Standard Interaction")]
    Neutral,
    #[strum(to_string = "No Data")]
    NoData,
}

/// Direction of sentiment between the early and late parts of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum Trend {
    #[strum(to_string = "Positive Shift - Mood improved")]
    PositiveShift,
    #[strum(to_string = "Negative Shift - Mood declined")]
    NegativeShift,
    #[strum(to_string = "Stable - Mood held steady")]
    Stable,
    #[strum(to_string = "Insufficient Data")]
    InsufficientData,
    #[strum(to_string = "None")]
    NoData,
}

/// Derived summary of one session. Never persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionReport {
    pub verdict: Verdict,
    pub trend: Trend,
    /// Mean of all scores, `0.0` for an empty session.
    pub final_score: f64,
}

/// Reduces a score series to a [`SessionReport`].
pub fn generate_report(scores: &[f64]) -> SessionReport {
    if scores.is_empty() {
        return SessionReport {
            verdict: Verdict::NoData,
            trend: Trend::NoData,
            final_score: 0.0,
        };
    }

    let avg = mean(scores);
    SessionReport {
        verdict: verdict_for(avg),
        trend: trend_for(scores),
        final_score: avg,
    }
}

fn verdict_for(avg: f64) -> Verdict {
    if avg >= VERDICT_THRESHOLD {
        Verdict::Positive
    } else if avg <= -VERDICT_THRESHOLD {
        Verdict::Negative
    } else {
        Verdict::Neutral
    }
}

fn trend_for(scores: &[f64]) -> Trend {
    if scores.len() < 2 {
        return Trend::InsufficientData;
    }

    let window = (scores.len() / 3).max(1);
    let start_avg = mean(&scores[..window]);
    let end_avg = mean(&scores[scores.len() - window..]);
    let diff = end_avg - start_avg;

    if diff > TREND_THRESHOLD {
        Trend::PositiveShift
    } else if diff < -TREND_THRESHOLD {
        Trend::NegativeShift
    } else {
        Trend::Stable
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
