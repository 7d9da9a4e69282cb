//! Sentiment-adaptive reply generation.
//!
//! The sentiment label of the user's turn picks a system persona; the reply is
//! streamed fragment by fragment from a [`ChatCompletionBackend`].

use futures::StreamExt;
use futures::stream::BoxStream;
use sentibot_core::SentibotError;
use sentibot_core::chat::{ChatCompletionBackend, ChatRequest};
use sentibot_core::sentiment::SentimentLabel;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const NEGATIVE_PERSONA: &str =
    "You are SentiBOT, an empathetic AI. The user is upset. Be apologetic, short, and helpful.";
pub const POSITIVE_PERSONA: &str =
    "You are SentiBOT, a cheerful AI. Match the user's energy! Keep it concise.";
pub const NEUTRAL_PERSONA: &str =
    "You are SentiBOT, a professional AI assistant. Be direct and helpful.";

/// System prompt for a user turn classified as `label`.
pub fn system_prompt_for(label: SentimentLabel) -> &'static str {
    match label {
        SentimentLabel::Negative => NEGATIVE_PERSONA,
        SentimentLabel::Positive => POSITIVE_PERSONA,
        SentimentLabel::Neutral => NEUTRAL_PERSONA,
    }
}

/// The fragment shown in place of a reply when the backend fails.
pub fn error_fragment(err: &SentibotError) -> String {
    format!("(Error: Ensure Ollama is running). Details: {}", err)
}

/// Streams persona-conditioned replies.
///
/// Generation never fails from the caller's point of view: backend errors are
/// turned into a single readable fragment that ends the stream.
#[derive(Clone)]
pub struct ResponseGenerator {
    backend: Arc<dyn ChatCompletionBackend>,
}

impl ResponseGenerator {
    pub fn new(backend: Arc<dyn ChatCompletionBackend>) -> Self {
        Self { backend }
    }

    /// Streams the reply to `user_text`.
    ///
    /// `cancel_flag` is checked before the request and between fragments;
    /// once set, the stream ends without an error fragment. Fragments already
    /// yielded stay with the caller.
    pub fn stream_response(
        &self,
        user_text: &str,
        label: SentimentLabel,
        cancel_flag: Arc<AtomicBool>,
    ) -> BoxStream<'static, String> {
        let backend = Arc::clone(&self.backend);
        let request = ChatRequest {
            system_prompt: system_prompt_for(label).to_string(),
            user_text: user_text.to_string(),
        };
        tracing::debug!(%label, model = backend.model(), "Generating reply");

        Box::pin(async_stream::stream! {
            if cancel_flag.load(Ordering::SeqCst) {
                tracing::debug!("Generation cancelled before the stream opened");
            } else {
                match backend.stream_chat(request).await {
                    Err(err) => {
                        tracing::warn!("Failed to open reply stream: {}", err);
                        yield error_fragment(&err);
                    }
                    Ok(mut fragments) => {
                        while let Some(item) = fragments.next().await {
                            if cancel_flag.load(Ordering::SeqCst) {
                                tracing::debug!("Generation cancelled mid-stream");
                                break;
                            }
                            match item {
                                Ok(fragment) => yield fragment,
                                Err(err) => {
                                    tracing::warn!("Reply stream failed: {}", err);
                                    yield error_fragment(&err);
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use sentibot_core::Result;
    use sentibot_core::chat::FragmentStream;
    use std::sync::Mutex;

    /// Replays a fixed script and records the requests it received.
    struct ScriptedBackend {
        script: Vec<Result<String>>,
        fail_open: bool,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String>>) -> Self {
            Self {
                script,
                fail_open: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                fail_open: true,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl ChatCompletionBackend for ScriptedBackend {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream> {
            self.requests.lock().unwrap().push(request);
            if self.fail_open {
                return Err(SentibotError::generation("connection refused"));
            }
            Ok(Box::pin(stream::iter(self.script.clone())))
        }
    }

    async fn collect(
        backend: Arc<ScriptedBackend>,
        label: SentimentLabel,
        cancel_flag: Arc<AtomicBool>,
    ) -> Vec<String> {
        let generator = ResponseGenerator::new(backend);
        generator
            .stream_response("where is my order?", label, cancel_flag)
            .collect()
            .await
    }

    #[test]
    fn test_persona_per_label() {
        assert!(system_prompt_for(SentimentLabel::Negative).contains("upset"));
        assert!(system_prompt_for(SentimentLabel::Positive).contains("cheerful"));
        assert!(system_prompt_for(SentimentLabel::Neutral).contains("professional"));
    }

    #[tokio::test]
    async fn test_fragments_arrive_in_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok("Sorry ".to_string()),
            Ok("about ".to_string()),
            Ok("that.".to_string()),
        ]));

        let fragments = collect(
            backend.clone(),
            SentimentLabel::Negative,
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        assert_eq!(fragments.concat(), "Sorry about that.");
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_prompt, NEGATIVE_PERSONA);
        assert_eq!(requests[0].user_text, "where is my order?");
    }

    #[tokio::test]
    async fn test_unreachable_backend_yields_single_error_fragment() {
        let fragments = collect(
            Arc::new(ScriptedBackend::unreachable()),
            SentimentLabel::Neutral,
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].starts_with("(Error: Ensure Ollama is running). Details:"));
        assert!(fragments[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_partial_text() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok("Half a ".to_string()),
            Err(SentibotError::generation("socket closed")),
            Ok("never seen".to_string()),
        ]));

        let fragments = collect(
            backend,
            SentimentLabel::Positive,
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0], "Half a ");
        assert!(fragments[1].contains("socket closed"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_yields_nothing() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("hello".to_string())]));

        let fragments = collect(
            backend.clone(),
            SentimentLabel::Neutral,
            Arc::new(AtomicBool::new(true)),
        )
        .await;
        assert!(fragments.is_empty());
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_between_fragments_stops_stream() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok("one ".to_string()),
            Ok("two ".to_string()),
            Ok("three".to_string()),
        ]));
        let generator = ResponseGenerator::new(backend);
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let mut stream =
            generator.stream_response("hi", SentimentLabel::Neutral, cancel_flag.clone());

        assert_eq!(stream.next().await.as_deref(), Some("one "));
        cancel_flag.store(true, Ordering::SeqCst);
        assert_eq!(stream.next().await, None);
    }
}
