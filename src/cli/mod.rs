use clap::Parser;
use crate::config::prompt::DEFAULT_SYSTEM_PROMPT;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:5000")]
    pub server_addr: String,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (openai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., https://api.openai.com)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider. An empty key only fails once a request is made.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-3.5-turbo, gpt-4o, llama3)
    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-3.5-turbo")]
    pub chat_model: String,

    /// Rewrite markdown headings and emphasis in model output into HTML tags.
    #[arg(long, env = "FORMAT_MARKUP", default_value = "true", action = clap::ArgAction::Set)]
    pub format_markup: bool,

    /// Timeout in seconds for outbound HTTP calls (completion and notification). 0 disables it.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "60")]
    pub http_timeout_secs: u64,

    // --- Knowledge Args ---
    /// Path to the knowledge base text file loaded at startup.
    #[arg(long, env = "KNOWLEDGE_PATH", default_value = "knowledge.txt")]
    pub knowledge_path: String,

    /// Role instructions sent as the first system message.
    #[arg(long, env = "SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    // --- Notifier Args ---
    /// Telegram bot token used to mirror transcripts. Notifications are disabled when empty.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", default_value = "", hide_env_values = true)]
    pub telegram_bot_token: String,

    /// Telegram chat id receiving the transcript lines.
    #[arg(long, env = "TELEGRAM_CHAT_ID", default_value = "")]
    pub telegram_chat_id: String,

    /// Base URL of the Telegram Bot API.
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = "https://api.telegram.org")]
    pub telegram_api_base: String,

    /// Telegram parse mode for transcript lines.
    #[arg(long, env = "NOTIFY_PARSE_MODE", default_value = "Markdown")]
    pub notify_parse_mode: String,

    // --- History Store Args ---
    /// History chat store type (memory, file, session)
    #[arg(long, env = "HISTORY_TYPE", default_value = "memory")]
    pub history_type: String,

    /// Directory holding one JSON document per user when HISTORY_TYPE=file.
    #[arg(long, env = "HISTORY_DIR", default_value = "history")]
    pub history_dir: String,

    /// Maximum number of user and assistant messages retained per conversation.
    #[arg(long, env = "HISTORY_WINDOW", default_value = "20")]
    pub history_window: usize,

    // --- Session Args ---
    /// Secret used to sign session cookies when HISTORY_TYPE=session.
    #[arg(long, env = "SESSION_SECRET_KEY", default_value = "", hide_env_values = true)]
    pub session_secret_key: String,

    /// Idle time in seconds after which a session conversation expires.
    #[arg(long, env = "SESSION_IDLE_SECS", default_value = "1800")]
    pub session_idle_secs: u64,

    /// Interval in seconds between sweeps of expired sessions.
    #[arg(long, env = "SESSION_SWEEP_SECS", default_value = "60")]
    pub session_sweep_secs: u64,
}

impl Args {
    pub fn is_session_backed(&self) -> bool {
        self.history_type.eq_ignore_ascii_case("session")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_surface() {
        let args = Args::try_parse_from(["consult-relay"]).unwrap();
        assert_eq!(args.server_addr, "127.0.0.1:5000");
        assert_eq!(args.chat_model, "gpt-3.5-turbo");
        assert_eq!(args.history_type, "memory");
        assert_eq!(args.history_window, 20);
        assert!(args.format_markup);
        assert!(!args.is_session_backed());
    }

    #[test]
    fn markup_can_be_switched_off() {
        let args = Args::try_parse_from([
            "consult-relay",
            "--format-markup",
            "false",
            "--history-type",
            "Session",
        ]).unwrap();
        assert!(!args.format_markup);
        assert!(args.is_session_backed());
    }
}
