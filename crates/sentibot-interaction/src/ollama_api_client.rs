//! OllamaApiClient - streaming client for a local Ollama server.
//!
//! Talks to `/api/chat` with `stream: true`. Ollama answers with
//! newline-delimited JSON objects, one per generated fragment, the last one
//! carrying `"done": true`.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use sentibot_core::chat::{ChatCompletionBackend, ChatRequest, FragmentStream};
use sentibot_core::config::GenerationConfig;
use sentibot_core::{Result, SentibotError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completion backend for the Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaApiClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaApiClient {
    /// Creates a client for `model` served at `endpoint`.
    ///
    /// `timeout` bounds connecting and every read on the connection, so only a
    /// stalled server fails a request. A reply that keeps streaming may run
    /// for as long as the model generates.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|err| SentibotError::generation(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Checks that the server answers and has the configured model pulled.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| SentibotError::generation(format!("Ollama is not reachable at {}: {err}", self.endpoint)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, body_text));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|err| SentibotError::generation(format!("Failed to parse Ollama model list: {err}")))?;

        if tags.models.iter().any(|m| model_matches(&m.name, &self.model)) {
            Ok(())
        } else {
            Err(SentibotError::generation(format!(
                "Model '{}' is not available on the Ollama server (try `ollama pull {}`)",
                self.model, self.model
            )))
        }
    }
}

#[async_trait]
impl ChatCompletionBackend for OllamaApiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream> {
        let url = format!("{}/api/chat", self.endpoint);
        let body = ChatApiRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: request.user_text,
                },
            ],
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| SentibotError::generation(format!("Ollama API request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Ollama error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        tracing::debug!(model = %self.model, "Opened Ollama chat stream");

        let mut bytes = Box::pin(response.bytes_stream());
        let fragments = async_stream::stream! {
            let mut decoder = LineDecoder::default();
            let mut finished = false;

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        finished = true;
                        yield Err(SentibotError::generation(format!("Ollama stream interrupted: {err}")));
                        break 'read;
                    }
                };

                for line in decoder.push(&chunk) {
                    match parse_chat_line(&line) {
                        Ok(parsed) => {
                            if !parsed.content.is_empty() {
                                yield Ok(parsed.content);
                            }
                            if parsed.done {
                                finished = true;
                                break 'read;
                            }
                        }
                        Err(err) => {
                            finished = true;
                            yield Err(err);
                            break 'read;
                        }
                    }
                }
            }

            // A server that closes without a trailing newline
            if !finished {
                if let Some(line) = decoder.finish() {
                    match parse_chat_line(&line) {
                        Ok(parsed) if !parsed.content.is_empty() => yield Ok(parsed.content),
                        Ok(_) => {}
                        Err(err) => yield Err(err),
                    }
                }
            }
        };

        Ok(Box::pin(fragments))
    }
}

#[derive(Serialize)]
struct ChatApiRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// One decoded line of the chat stream.
#[derive(Debug, PartialEq)]
struct ChatLine {
    content: String,
    done: bool,
}

fn parse_chat_line(line: &str) -> Result<ChatLine> {
    let chunk: ChatChunk = serde_json::from_str(line).map_err(|err| {
        SentibotError::generation(format!("Malformed Ollama stream line: {err}"))
    })?;

    if let Some(error) = chunk.error {
        return Err(SentibotError::generation(error));
    }

    Ok(ChatLine {
        content: chunk.message.map(|m| m.content).unwrap_or_default(),
        done: chunk.done,
    })
}

/// `llama3` matches `llama3:latest`; an explicit tag must match exactly.
fn model_matches(available: &str, wanted: &str) -> bool {
    available == wanted
        || (!wanted.contains(':')
            && available
                .strip_prefix(wanted)
                .is_some_and(|rest| rest.starts_with(':')))
}

fn map_http_error(status: StatusCode, body: String) -> SentibotError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error)
        .unwrap_or(body);
    SentibotError::generation(format!("Ollama API error ({}): {}", status.as_u16(), message))
}

/// Splits a byte stream into lines.
///
/// Network chunks may end in the middle of a line or of a UTF-8 sequence, so
/// bytes are buffered until a newline arrives.
#[derive(Default)]
struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Feeds `chunk` and returns every complete, non-blank line.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        lines
    }

    /// Returns whatever is left once the stream has ended.
    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&rest);
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers a single HTTP request with `status` and a close-delimited body
    /// written in `parts`, sleeping `gap` before each part. Resolves to the
    /// raw request text.
    async fn serve_once(
        status: &'static str,
        parts: Vec<String>,
        gap: Duration,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let body_len = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + body_len {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/x-ndjson\r\nConnection: close\r\n\r\n"
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            for part in parts {
                tokio::time::sleep(gap).await;
                // The client may hang up once it has seen the final line
                if socket.write_all(part.as_bytes()).await.is_err() {
                    break;
                }
                let _ = socket.flush().await;
            }
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).to_string()
        });

        (base_url, handle)
    }

    fn content_line(content: &str) -> String {
        format!("{{\"message\":{{\"role\":\"assistant\",\"content\":\"{content}\"}},\"done\":false}}\n")
    }

    fn done_line() -> String {
        "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n".to_string()
    }

    fn chat_request() -> ChatRequest {
        ChatRequest {
            system_prompt: "You are terse.".to_string(),
            user_text: "hello".to_string(),
        }
    }

    async fn collect_fragments(client: &OllamaApiClient) -> Vec<std::result::Result<String, String>> {
        client
            .stream_chat(chat_request())
            .await
            .unwrap()
            .map(|item| item.map_err(|e| e.to_string()))
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_stream_chat_ends_at_done_line() {
        let (url, server) = serve_once(
            "200 OK",
            vec![
                content_line("Hi "),
                content_line("there"),
                done_line(),
                content_line("ignored"),
            ],
            Duration::ZERO,
        )
        .await;
        let client = OllamaApiClient::new(url, "llama3", Duration::from_secs(5)).unwrap();

        let fragments = collect_fragments(&client).await;
        assert_eq!(fragments, vec![Ok("Hi ".to_string()), Ok("there".to_string())]);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/chat"));
        assert!(request.contains("\"stream\":true"));
        assert!(request.contains("\"content\":\"You are terse.\""));
        assert!(request.contains("\"role\":\"user\""));
    }

    #[tokio::test]
    async fn test_stream_chat_flushes_line_without_newline() {
        let tail = content_line("end");
        let (url, _server) = serve_once(
            "200 OK",
            vec![content_line("the "), tail.trim_end().to_string()],
            Duration::ZERO,
        )
        .await;
        let client = OllamaApiClient::new(url, "llama3", Duration::from_secs(5)).unwrap();

        let fragments = collect_fragments(&client).await;
        assert_eq!(fragments, vec![Ok("the ".to_string()), Ok("end".to_string())]);
    }

    #[tokio::test]
    async fn test_steady_stream_outlives_timeout() {
        let mut parts: Vec<String> = (0..4).map(|i| content_line(&format!("w{i} "))).collect();
        parts.push(done_line());
        let (url, _server) = serve_once("200 OK", parts, Duration::from_millis(400)).await;
        let client = OllamaApiClient::new(url, "llama3", Duration::from_secs(1)).unwrap();

        let fragments = collect_fragments(&client).await;
        let text: String = fragments.into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(text, "w0 w1 w2 w3 ");
    }

    #[tokio::test]
    async fn test_stream_chat_error_status() {
        let (url, _server) = serve_once(
            "404 Not Found",
            vec!["{\"error\":\"model 'llama9' not found\"}".to_string()],
            Duration::ZERO,
        )
        .await;
        let client = OllamaApiClient::new(url, "llama9", Duration::from_secs(5)).unwrap();

        let err = client.stream_chat(chat_request()).await.err().unwrap();
        assert!(err.is_generation());
        assert_eq!(
            err.to_string(),
            "Generation backend error: Ollama API error (404): model 'llama9' not found"
        );
    }

    #[tokio::test]
    async fn test_stream_chat_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let client = OllamaApiClient::new(url, "llama3", Duration::from_secs(5)).unwrap();

        let err = client.stream_chat(chat_request()).await.err().unwrap();
        assert!(err.is_generation());
        assert!(err.to_string().contains("Ollama API request failed"));
    }

    #[tokio::test]
    async fn test_health_check_finds_pulled_model() {
        let (url, server) = serve_once(
            "200 OK",
            vec![r#"{"models":[{"name":"mistral:latest"},{"name":"llama3:latest"}]}"#.to_string()],
            Duration::ZERO,
        )
        .await;
        let client = OllamaApiClient::new(url, "llama3", Duration::from_secs(5)).unwrap();

        client.health_check().await.unwrap();
        assert!(server.await.unwrap().starts_with("GET /api/tags"));
    }

    #[tokio::test]
    async fn test_health_check_reports_missing_model() {
        let (url, _server) = serve_once(
            "200 OK",
            vec![r#"{"models":[{"name":"mistral:latest"}]}"#.to_string()],
            Duration::ZERO,
        )
        .await;
        let client = OllamaApiClient::new(url, "llama3", Duration::from_secs(5)).unwrap();

        let err = client.health_check().await.unwrap_err();
        assert!(err.to_string().contains("ollama pull llama3"));
    }

    #[test]
    fn test_decoder_joins_split_lines() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push(b"{\"a\":").is_empty());
        assert_eq!(decoder.push(b"1}\n{\"b\":2}\n"), vec!["{\"a\":1}", "{\"b\":2}"]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_keeps_multibyte_characters_across_chunks() {
        let line = "{\"message\":{\"content\":\"café ☕\"}}\n".as_bytes();
        // Split inside the three-byte encoding of the cup
        let split = line.len() - 5;
        let mut decoder = LineDecoder::default();
        assert!(decoder.push(&line[..split]).is_empty());
        let lines = decoder.push(&line[split..]);
        assert_eq!(parse_chat_line(&lines[0]).unwrap().content, "café ☕");
    }

    #[test]
    fn test_decoder_skips_blank_lines_and_flushes_tail() {
        let mut decoder = LineDecoder::default();
        assert_eq!(decoder.push(b"\n\r\n{\"x\":1}\n{\"y\""), vec!["{\"x\":1}"]);
        assert_eq!(decoder.push(b":2}").len(), 0);
        assert_eq!(decoder.finish().as_deref(), Some("{\"y\":2}"));
    }

    #[test]
    fn test_parse_content_line() {
        let line = r#"{"model":"llama3","created_at":"2024-05-01T09:30:00Z","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        assert_eq!(
            parse_chat_line(line).unwrap(),
            ChatLine {
                content: "Hel".to_string(),
                done: false
            }
        );
    }

    #[test]
    fn test_parse_final_line() {
        let line = r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true,"total_duration":123}"#;
        let parsed = parse_chat_line(line).unwrap();
        assert!(parsed.done);
        assert!(parsed.content.is_empty());
    }

    #[test]
    fn test_parse_error_line() {
        let err = parse_chat_line(r#"{"error":"model 'llama9' not found"}"#).unwrap_err();
        assert!(err.is_generation());
        assert!(err.to_string().contains("llama9"));
    }

    #[test]
    fn test_parse_garbage_line() {
        assert!(parse_chat_line("<html>").unwrap_err().is_generation());
    }

    #[test]
    fn test_model_matching() {
        assert!(model_matches("llama3:latest", "llama3"));
        assert!(model_matches("llama3:8b", "llama3:8b"));
        assert!(!model_matches("llama3:70b", "llama3:8b"));
        assert!(!model_matches("llama3.1:latest", "llama3"));
    }

    #[test]
    fn test_http_error_uses_json_message() {
        let err = map_http_error(
            StatusCode::NOT_FOUND,
            r#"{"error":"model \"llama3\" not found, try pulling it first"}"#.to_string(),
        );
        assert_eq!(
            err.to_string(),
            "Generation backend error: Ollama API error (404): model \"llama3\" not found, try pulling it first"
        );
    }

    #[test]
    fn test_from_config_trims_trailing_slash() {
        let config = GenerationConfig {
            endpoint: "http://127.0.0.1:11434/".to_string(),
            ..GenerationConfig::default()
        };
        let client = OllamaApiClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:11434");
        assert_eq!(client.model(), "llama3");
    }
}
