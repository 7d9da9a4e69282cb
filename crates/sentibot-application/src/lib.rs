//! Application layer for SentiBOT.
//!
//! Hosts the orchestrator that drives one user turn through classification,
//! reply generation and rendering, plus the explicit state and view seams it
//! works against.

pub mod chat_session;
pub mod chat_usecase;
pub mod session_view;

pub use chat_session::ChatSession;
pub use chat_usecase::{AnalysisOutcome, ChatUseCase, TurnOutcome};
pub use session_view::SessionView;
