//! Chat completion boundary.

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Fragments of one streamed completion, in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// One completion request: a system prompt and the user's latest text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub user_text: String,
}

/// A chat-completion service that streams its answer.
///
/// The model identifier is fixed per backend instance. Errors may surface
/// either when opening the stream or as an `Err` item mid-stream.
#[async_trait]
pub trait ChatCompletionBackend: Send + Sync {
    /// Identifier of the model answering requests.
    fn model(&self) -> &str;

    /// Opens a streaming completion for `request`.
    async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream>;
}
