use crate::config::knowledge::KnowledgeBase;
use crate::models::chat::ChatMessage;
use std::sync::Arc;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a friendly consultant for an online design project service. \
Only answer questions based on the provided knowledge base. \
If the answer is not in the knowledge base, ask the user to leave their email, and the expert will answer soon. \
Don't forget to ask how the client would like to be addressed.";

/// The two system messages that open every conversation: role instructions
/// followed by the knowledge base.
#[derive(Debug, Clone)]
pub struct Preamble {
    instruction: String,
    knowledge: Arc<KnowledgeBase>,
}

impl Preamble {
    pub fn new(instruction: impl Into<String>, knowledge: Arc<KnowledgeBase>) -> Self {
        Self {
            instruction: instruction.into(),
            knowledge,
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.instruction.clone()),
            ChatMessage::system(format!("Knowledge base: {}", self.knowledge.text()))
        ]
    }
}
