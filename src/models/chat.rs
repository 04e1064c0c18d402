use serde::{ Serialize, Deserialize };
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// Ordered message log for one user or session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), messages: Vec::new() }
    }

    /// A fresh conversation that starts with the given system messages.
    pub fn seeded(id: impl Into<String>, preamble: Vec<ChatMessage>) -> Self {
        Self { id: id.into(), messages: preamble }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn system_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.is_system())
    }

    /// User and assistant messages in chronological order.
    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| !m.is_system())
    }

    pub fn history_len(&self) -> usize {
        self.history().count()
    }

    /// Keeps every system message and only the `max_messages` most recent
    /// user/assistant messages. System messages end up ahead of the history,
    /// each group in its original order.
    pub fn trim(&mut self, max_messages: usize) {
        let (system, rest): (Vec<ChatMessage>, Vec<ChatMessage>) = std::mem
            ::take(&mut self.messages)
            .into_iter()
            .partition(ChatMessage::is_system);

        let skip = rest.len().saturating_sub(max_messages);
        self.messages = system;
        self.messages.extend(rest.into_iter().skip(skip));
    }
}
