use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::time::Duration;

use super::{ build_http_client, ChatClient, CompletionResponse };
use crate::llm::{ status_error, CompletionError, LlmConfig, LlmType };
use crate::models::chat::ChatMessage;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub struct OpenAIChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>
    ) -> Result<Self, CompletionError> {
        let chat_model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            http: build_http_client(timeout)?,
            api_key,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        if config.llm_type != LlmType::OpenAI {
            return Err(CompletionError::Config("Invalid config type for OpenAIChatClient".into()));
        }

        Self::new(
            config.api_key.clone().unwrap_or_default(),
            config.completion_model.clone(),
            config.base_url.clone(),
            config.timeout
        )
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, CompletionError> {
        let url = self.endpoint();
        let req = OpenAIChatRequest {
            model: &self.model,
            messages,
        };
        debug!("POST {} with {} messages", url, messages.len());

        let mut builder = self.http.post(&url).json(&req);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        let body = resp.json::<OpenAIResponse>().await?;

        let content = body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::Empty)?;

        Ok(CompletionResponse { response: content.trim().to_string() })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
