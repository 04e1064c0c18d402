use crate::cli::Args;
use crate::config::knowledge::KnowledgeBase;
use crate::config::prompt::Preamble;
use crate::history::{ initialize_history_store, HistoryStore };
use crate::llm::chat::new_client as new_chat_client;
use crate::llm::completion::Completer;
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::{ ChatMessage, Conversation };
use crate::notify::{ bot_line, client_line, create_notifier, Notifier };

use log::{ info, warn, error };
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

pub const FALLBACK_RESPONSE: &str =
    "I'm sorry, but I couldn't process your request at this time. Please try again later.";

pub const ANONYMOUS_USER: &str = "anonymous";

pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Drives one prompt through history, notification and completion.
/// Downstream failures never abort a request: completion errors become
/// [`FALLBACK_RESPONSE`], notifier and history errors are logged.
#[derive(Clone)]
pub struct RelayAgent {
    completer: Completer,
    history_store: Arc<dyn HistoryStore>,
    notifier: Arc<dyn Notifier>,
    preamble: Arc<Preamble>,
    history_window: usize,
}

impl RelayAgent {
    pub fn from_parts(
        completer: Completer,
        history_store: Arc<dyn HistoryStore>,
        notifier: Arc<dyn Notifier>,
        preamble: Arc<Preamble>,
        history_window: usize
    ) -> Self {
        Self {
            completer,
            history_store,
            notifier,
            preamble,
            history_window,
        }
    }

    pub async fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let knowledge = KnowledgeBase::load(&args.knowledge_path)?;
        let preamble = Arc::new(Preamble::new(args.system_prompt.clone(), knowledge));

        let chat_config = LlmConfig {
            llm_type: args.chat_llm_type
                .parse::<LlmType>()
                .map_err(|e| format!("Invalid chat LLM type: {}", e))?,
            base_url: args.chat_base_url.clone(),
            api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
            completion_model: Some(args.chat_model.clone()),
            timeout: Some(args.http_timeout_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        };
        if chat_config.llm_type == LlmType::OpenAI && chat_config.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; completion requests will fail until it is.");
        }
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}, BaseURL={}",
            chat_config.llm_type,
            chat_client.get_model(),
            chat_client.get_base_url().unwrap_or_else(|| "adapter default".to_string())
        );

        let completer = Completer::new(chat_client, Arc::clone(&preamble), args.format_markup);
        let history_store = initialize_history_store(args, Arc::clone(&preamble))?;
        let notifier = create_notifier(args)?;

        Ok(Self::from_parts(completer, history_store, notifier, preamble, args.history_window))
    }

    pub fn history_store(&self) -> &Arc<dyn HistoryStore> {
        &self.history_store
    }

    /// `conversation_key` selects the stored history (user id or session id);
    /// `user_id` labels the transcript lines.
    pub async fn process_message(
        &self,
        conversation_key: &str,
        user_id: &str,
        prompt: &str
    ) -> String {
        info!("Received prompt from {}: {}", user_id, prompt);

        let conversation = match self.history_store.get_or_create(conversation_key).await {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!("History load for {} failed, continuing without it: {}", conversation_key, e);
                Conversation::seeded(conversation_key, self.preamble.messages())
            }
        };

        self.record(conversation_key, ChatMessage::user(prompt)).await;
        self.notify(&client_line(prompt, user_id)).await;

        let response = match self.completer.complete(&conversation, prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!("Error communicating with completion API: {}", e);
                FALLBACK_RESPONSE.to_string()
            }
        };
        info!("Response for {}: {}", user_id, response);

        self.record(conversation_key, ChatMessage::assistant(response.clone())).await;
        self.notify(&bot_line(&response, user_id)).await;

        response
    }

    async fn record(&self, conversation_key: &str, message: ChatMessage) {
        let role = message.role;
        if let Err(e) = self.history_store.append(conversation_key, message).await {
            warn!("History write ({}) failed: {}", role, e);
            return;
        }
        if let Err(e) = self.history_store.trim(conversation_key, self.history_window).await {
            warn!("History trim failed: {}", e);
        }
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.notifier.notify(text).await {
            warn!("Notification failed: {}", e);
        }
    }
}
