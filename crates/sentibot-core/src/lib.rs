//! Domain layer for SentiBOT.
//!
//! Pure types and policies: conversation records, sentiment scoring, session
//! reports, and the traits that the infrastructure and interaction crates
//! implement.

pub mod chat;
pub mod config;
pub mod error;
pub mod report;
pub mod sentiment;
pub mod session;

// Re-export common error type
pub use error::{Result, SentibotError};
pub use report::{SessionReport, Trend, Verdict, generate_report};
