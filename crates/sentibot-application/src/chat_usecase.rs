//! Chat use case: the per-turn pipeline and the session-level actions.

use crate::chat_session::ChatSession;
use crate::session_view::SessionView;
use anyhow::{Context, Result};
use futures::StreamExt;
use sentibot_core::sentiment::{SentimentAnalysis, SentimentAnalyzer};
use sentibot_core::session::SessionStore;
use sentibot_core::{SessionReport, generate_report};
use sentibot_interaction::ResponseGenerator;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What one user turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub analysis: SentimentAnalysis,
    pub reply: String,
    /// The reply was cut short through the cancel flag.
    pub cancelled: bool,
}

/// Result of "End & Analyze".
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub report: SessionReport,
    /// File the session was saved to, `None` when there was nothing to save.
    pub saved_as: Option<String>,
}

/// Orchestrates classifier, generator and store around a [`ChatSession`].
///
/// All collaborators are built once and shared for the lifetime of the
/// process. Turns are handled strictly one at a time.
pub struct ChatUseCase {
    analyzer: Arc<SentimentAnalyzer>,
    generator: ResponseGenerator,
    store: Arc<dyn SessionStore>,
}

impl ChatUseCase {
    pub fn new(
        analyzer: Arc<SentimentAnalyzer>,
        generator: ResponseGenerator,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            analyzer,
            generator,
            store,
        }
    }

    /// Runs one user turn.
    ///
    /// The user text and its score are recorded first, then the reply streams
    /// into `view` and is recorded as a single assistant turn. A cancelled
    /// reply keeps whatever arrived before cancellation. Never fails: the
    /// classifier and the generator degrade to safe defaults.
    pub async fn handle_user_turn(
        &self,
        session: &mut ChatSession,
        text: &str,
        view: &mut dyn SessionView,
        cancel_flag: Arc<AtomicBool>,
    ) -> TurnOutcome {
        session.record_mut().push_user_turn(text);

        let analysis = self.classify(text).await;
        session.record_mut().push_score(analysis.score);

        view.begin_reply();
        let mut reply = String::new();
        let mut fragments = self
            .generator
            .stream_response(text, analysis.label, Arc::clone(&cancel_flag));
        while let Some(fragment) = fragments.next().await {
            view.show_fragment(&fragment);
            reply.push_str(&fragment);
        }
        let cancelled = cancel_flag.load(Ordering::SeqCst);
        view.end_reply(cancelled);

        if cancelled {
            tracing::info!(chars = reply.len(), "Reply cancelled, keeping partial text");
        }
        session.record_mut().push_assistant_turn(reply.clone());

        view.render(session);

        TurnOutcome {
            analysis,
            reply,
            cancelled,
        }
    }

    /// "New Chat": saves the current conversation, then starts an empty one.
    ///
    /// If the save fails the session is left untouched so nothing is lost.
    pub async fn new_chat(
        &self,
        session: &mut ChatSession,
        view: &mut dyn SessionView,
    ) -> Result<Option<String>> {
        let saved_as = self
            .store
            .save(session.record())
            .await
            .context("Failed to save the current chat")?;

        session.reset();
        view.render(session);
        tracing::info!(saved_as = ?saved_as, "Started new chat");

        Ok(saved_as)
    }

    /// "End & Analyze": shows the session report and chart, then saves.
    ///
    /// The report is shown even when saving fails afterwards.
    pub async fn end_and_analyze(
        &self,
        session: &ChatSession,
        view: &mut dyn SessionView,
    ) -> Result<AnalysisOutcome> {
        let report = generate_report(session.scores());
        tracing::info!(
            verdict = %report.verdict,
            trend = %report.trend,
            final_score = report.final_score,
            "Session analyzed"
        );
        view.show_report(&report, session.scores());

        let saved_as = self
            .store
            .save(session.record())
            .await
            .context("Failed to save the analyzed chat")?;

        Ok(AnalysisOutcome { report, saved_as })
    }

    /// Replaces the active conversation with a saved one.
    ///
    /// The current conversation is discarded without saving. On error the
    /// session is left untouched.
    pub async fn load_session(
        &self,
        session: &mut ChatSession,
        name: &str,
        view: &mut dyn SessionView,
    ) -> Result<()> {
        let record = self
            .store
            .load(name)
            .await
            .with_context(|| format!("Failed to load session '{}'", name))?;

        session.replace(record);
        view.show_transcript(session.turns());
        view.render(session);
        tracing::info!(file = %name, turns = session.turns().len(), "Loaded session");

        Ok(())
    }

    /// Saved sessions, most recent first.
    pub async fn history(&self) -> Result<Vec<String>> {
        self.store
            .list()
            .await
            .context("Failed to list saved sessions")
    }

    async fn classify(&self, text: &str) -> SentimentAnalysis {
        let analyzer = Arc::clone(&self.analyzer);
        let text = text.to_string();
        match tokio::task::spawn_blocking(move || analyzer.analyze(&text)).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!("Classifier task failed, falling back to neutral: {}", e);
                SentimentAnalysis::neutral()
            }
        }
    }
}
