//! Render seam between the orchestrator and a concrete user interface.

use crate::chat_session::ChatSession;
use sentibot_core::SessionReport;
use sentibot_core::session::Turn;

/// Everything the orchestrator asks a user interface to display.
///
/// Calls happen in conversation order. The orchestrator invokes
/// [`render`](SessionView::render) after every mutation of the session so
/// that derived state such as the mood badge is always current.
pub trait SessionView {
    /// Replays a whole transcript, e.g. after loading a saved session.
    fn show_transcript(&mut self, turns: &[Turn]);

    /// An assistant reply is about to stream in.
    fn begin_reply(&mut self);

    fn show_fragment(&mut self, fragment: &str);

    /// The reply is complete (or was cut short).
    fn end_reply(&mut self, cancelled: bool);

    /// Refreshes state derived from the session.
    fn render(&mut self, session: &ChatSession);

    /// Shows the summary of a finished session next to its raw scores.
    fn show_report(&mut self, report: &SessionReport, scores: &[f64]);

    fn show_notice(&mut self, message: &str);

    fn show_error(&mut self, message: &str);
}
