pub mod chat;
pub mod completion;
pub mod markup;
use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use std::fmt;
use std::time::Duration;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    OpenAI,
    Ollama,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLlmTypeError {
    message: String,
}

impl fmt::Display for ParseLlmTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLlmTypeError {}
impl FromStr for LlmType {
    type Err = ParseLlmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmType::OpenAI),
            "ollama" => Ok(LlmType::Ollama),
            _ =>
                Err(ParseLlmTypeError {
                    message: format!("Invalid LLM type: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmType::OpenAI => f.write_str("openai"),
            LlmType::Ollama => f.write_str("ollama"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            llm_type: LlmType::OpenAI,
            api_key: None,
            completion_model: None,
            base_url: None,
            timeout: None,
        }
    }
}

/// Any failure reaching or understanding the completion API.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("completion API returned {status}: {body}")]
    Status {
        status: StatusCode,
        body: String,
    },

    #[error("completion API returned no choices")]
    Empty,

    #[error("invalid completion client configuration: {0}")]
    Config(String),
}

/// Longest error body kept in a `Status` error.
const MAX_ERROR_BODY: usize = 512;

pub(crate) async fn status_error(resp: reqwest::Response) -> CompletionError {
    let status = resp.status();
    let mut body = resp.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    CompletionError::Status { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_providers_case_insensitively() {
        assert_eq!("OpenAI".parse::<LlmType>(), Ok(LlmType::OpenAI));
        assert_eq!(" ollama ".parse::<LlmType>(), Ok(LlmType::Ollama));
        assert!("gemini".parse::<LlmType>().is_err());
    }
}
