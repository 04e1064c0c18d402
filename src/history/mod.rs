mod file;
mod memory;
mod session;

pub use file::FileHistoryStore;
pub use memory::MemoryHistoryStore;
pub use session::SessionHistoryStore;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use crate::cli::Args;
use crate::config::prompt::Preamble;
use crate::models::chat::{ ChatMessage, Conversation };

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported history store type: {0}")]
    Unsupported(String),
}

/// Per-key conversation log. Keys are user ids, or session ids when the store
/// is session backed. Every operation is atomic per key.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns the stored conversation, creating and persisting a seeded one
    /// when the key is unknown.
    async fn get_or_create(&self, key: &str) -> Result<Conversation, HistoryError>;

    async fn append(&self, key: &str, message: ChatMessage) -> Result<(), HistoryError>;

    /// Keeps all system messages and the `max_messages` newest others.
    async fn trim(&self, key: &str, max_messages: usize) -> Result<(), HistoryError>;
}

pub fn create_history_store(
    args: &Args,
    preamble: Arc<Preamble>
) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    match args.history_type.to_lowercase().as_str() {
        "memory" => Ok(Arc::new(MemoryHistoryStore::new(preamble))),
        "file" => {
            let store = FileHistoryStore::new(&args.history_dir, preamble)?;
            Ok(Arc::new(store))
        }
        "session" => {
            let store = Arc::new(
                SessionHistoryStore::new(preamble, Duration::from_secs(args.session_idle_secs))
            );
            store.spawn_sweeper(Duration::from_secs(args.session_sweep_secs.max(1)));
            Ok(store as Arc<dyn HistoryStore>)
        }
        other => Err(HistoryError::Unsupported(other.to_string())),
    }
}

pub fn initialize_history_store(
    args: &Args,
    preamble: Arc<Preamble>
) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    match args.history_type.to_lowercase().as_str() {
        "file" => info!("Chat history will be stored in: file at {}", args.history_dir),
        "session" =>
            info!(
                "Chat history will be stored in: session (idle expiry {}s)",
                args.session_idle_secs
            ),
        other => info!("Chat history will be stored in: {}", other),
    }
    create_history_store(args, preamble)
}
