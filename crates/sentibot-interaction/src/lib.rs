//! Adapters to the outside models: the local sentiment classifier and the
//! streaming chat-completion server.

pub mod ollama_api_client;
pub mod response_generator;
pub mod roberta_classifier;

pub use ollama_api_client::OllamaApiClient;
pub use response_generator::{ResponseGenerator, system_prompt_for};
pub use roberta_classifier::RobertaSentimentModel;
