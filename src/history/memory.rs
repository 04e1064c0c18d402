use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use crate::config::prompt::Preamble;
use crate::history::{ HistoryError, HistoryStore };
use crate::models::chat::{ ChatMessage, Conversation };

/// Process-local store; conversations are lost on restart.
pub struct MemoryHistoryStore {
    conversations: DashMap<String, Conversation>,
    preamble: Arc<Preamble>,
}

impl MemoryHistoryStore {
    pub fn new(preamble: Arc<Preamble>) -> Self {
        Self {
            conversations: DashMap::new(),
            preamble,
        }
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    fn seed(&self, key: &str) -> Conversation {
        Conversation::seeded(key, self.preamble.messages())
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn get_or_create(&self, key: &str) -> Result<Conversation, HistoryError> {
        let entry = self.conversations
            .entry(key.to_string())
            .or_insert_with(|| self.seed(key));
        Ok(entry.value().clone())
    }

    async fn append(&self, key: &str, message: ChatMessage) -> Result<(), HistoryError> {
        self.conversations
            .entry(key.to_string())
            .or_insert_with(|| self.seed(key))
            .push(message);
        Ok(())
    }

    async fn trim(&self, key: &str, max_messages: usize) -> Result<(), HistoryError> {
        if let Some(mut conversation) = self.conversations.get_mut(key) {
            conversation.trim(max_messages);
        }
        Ok(())
    }
}
