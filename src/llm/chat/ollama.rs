use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use async_trait::async_trait;
use std::time::Duration;
use super::{ build_http_client, ChatClient, CompletionResponse };
use crate::llm::{ status_error, CompletionError, LlmConfig, LlmType };
use crate::models::chat::ChatMessage;

#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    completion_model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaClient {
    pub fn new(
        base_url: Option<String>,
        completion_model: Option<String>,
        timeout: Option<Duration>
    ) -> Result<Self, CompletionError> {
        let model = completion_model.unwrap_or_else(|| "cogito:3b".to_string());
        let url = base_url.unwrap_or_else(|| "http://localhost:11434".into());

        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: url,
            completion_model: model,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        if config.llm_type != LlmType::Ollama {
            return Err(CompletionError::Config("Invalid config type for OllamaClient".into()));
        }

        Self::new(config.base_url.clone(), config.completion_model.clone(), config.timeout)
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, CompletionError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let req = ChatRequest {
            model: &self.completion_model,
            messages,
            stream: false,
        };
        let resp = self.http.post(&url).json(&req).send().await?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        let data = resp.json::<ChatResponse>().await?;
        let content = data.message.map(|m| m.content).ok_or(CompletionError::Empty)?;
        Ok(CompletionResponse { response: content.trim().to_string() })
    }

    fn get_model(&self) -> String {
        self.completion_model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn posts_non_streaming_chat_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .json_body_includes(
                    json!({
                        "model": "llama3",
                        "stream": false,
                        "messages": [{"role": "user", "content": "Hello"}]
                    }).to_string()
                );
            then.status(200).json_body(
                json!({
                    "model": "llama3",
                    "message": {"role": "assistant", "content": "Hey!"},
                    "done": true
                })
            );
        });

        let client = OllamaClient::new(
            Some(server.base_url()),
            Some("llama3".to_string()),
            None
        ).unwrap();
        let resp = client.complete(&[ChatMessage::user("Hello")]).await.unwrap();

        mock.assert();
        assert_eq!(resp.response, "Hey!");
    }

    #[test]
    fn rejects_foreign_config() {
        let config = LlmConfig { llm_type: LlmType::OpenAI, ..Default::default() };
        assert!(matches!(OllamaClient::from_config(&config), Err(CompletionError::Config(_))));
    }
}
