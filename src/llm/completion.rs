use crate::config::prompt::Preamble;
use crate::llm::chat::ChatClient;
use crate::llm::markup::markdown_to_markup;
use crate::llm::CompletionError;
use crate::models::chat::{ ChatMessage, Conversation };
use log::debug;
use std::sync::Arc;

/// Builds the full request for one prompt and post-processes the answer.
#[derive(Clone)]
pub struct Completer {
    client: Arc<dyn ChatClient>,
    preamble: Arc<Preamble>,
    format_markup: bool,
}

impl Completer {
    pub fn new(client: Arc<dyn ChatClient>, preamble: Arc<Preamble>, format_markup: bool) -> Self {
        Self {
            client,
            preamble,
            format_markup,
        }
    }

    /// Instruction, knowledge base, the retained history, then the new prompt.
    /// System messages stored in the conversation are replaced by the current
    /// preamble so a reloaded knowledge base takes effect for old conversations.
    pub fn assemble(&self, conversation: &Conversation, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = self.preamble.messages();
        messages.extend(conversation.history().cloned());
        messages.push(ChatMessage::user(prompt));
        messages
    }

    pub async fn complete(
        &self,
        conversation: &Conversation,
        prompt: &str
    ) -> Result<String, CompletionError> {
        let messages = self.assemble(conversation, prompt);
        debug!(
            "Requesting completion from model {} with {} messages",
            self.client.get_model(),
            messages.len()
        );
        let text = self.client.complete(&messages).await?.response;
        if self.format_markup {
            Ok(markdown_to_markup(&text))
        } else {
            Ok(text)
        }
    }
}
