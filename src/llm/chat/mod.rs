pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use super::{ CompletionError, LlmConfig, LlmType };
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;
use crate::models::chat::ChatMessage;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub response: String,
}

/// A provider that turns an ordered message list into one completion.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, CompletionError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, CompletionError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

pub(crate) fn build_http_client(
    timeout: Option<Duration>
) -> Result<reqwest::Client, CompletionError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}
