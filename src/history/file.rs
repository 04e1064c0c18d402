use async_trait::async_trait;
use dashmap::DashMap;
use log::{ debug, warn };
use sha2::{ Digest, Sha256 };
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use crate::config::prompt::Preamble;
use crate::history::{ HistoryError, HistoryStore };
use crate::models::chat::{ ChatMessage, Conversation };

type Slot = Arc<Mutex<Option<Conversation>>>;

/// One JSON document per user holding the message array. Documents are read
/// on first touch, cached, and rewritten whole after every change.
pub struct FileHistoryStore {
    dir: PathBuf,
    preamble: Arc<Preamble>,
    slots: DashMap<String, Slot>,
}

impl FileHistoryStore {
    pub fn new<P: AsRef<Path>>(dir: P, preamble: Arc<Preamble>) -> Result<Self, HistoryError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            preamble,
            slots: DashMap::new(),
        })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }

    fn slot(&self, key: &str) -> Slot {
        Arc::clone(&self.slots.entry(key.to_string()).or_default())
    }

    /// Fills the slot from disk, or seeds and persists a new conversation.
    async fn load(&self, key: &str, slot: &mut Option<Conversation>) -> Result<(), HistoryError> {
        if slot.is_some() {
            return Ok(());
        }

        let path = self.path_for(key);
        let loaded = match fs::read(&path).await {
            Ok(bytes) =>
                match serde_json::from_slice::<Vec<ChatMessage>>(&bytes) {
                    Ok(messages) => Some(Conversation { id: key.to_string(), messages }),
                    Err(e) => {
                        warn!("Discarding unreadable history file {}: {}", path.display(), e);
                        None
                    }
                }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e.into());
            }
        };

        let conversation = match loaded {
            Some(conversation) => conversation,
            None => {
                let seeded = Conversation::seeded(key, self.preamble.messages());
                self.persist(&seeded).await?;
                seeded
            }
        };
        *slot = Some(conversation);
        Ok(())
    }

    /// Writes to a sibling temp file and renames it over the document.
    async fn persist(&self, conversation: &Conversation) -> Result<(), HistoryError> {
        let path = self.path_for(&conversation.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(&conversation.messages)?;
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;
        debug!("Saved {} messages to {}", conversation.len(), path.display());
        Ok(())
    }

    async fn update<F>(&self, key: &str, change: F) -> Result<(), HistoryError>
        where F: FnOnce(&mut Conversation) + Send
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;
        self.load(key, &mut guard).await?;

        let mut next = match guard.as_ref() {
            Some(current) => current.clone(),
            None => Conversation::seeded(key, self.preamble.messages()),
        };
        change(&mut next);
        self.persist(&next).await?;
        *guard = Some(next);
        Ok(())
    }
}

/// Safe ids are used verbatim; anything else is hashed so it cannot escape
/// the directory or collide with a safe id.
fn file_stem(key: &str) -> String {
    let safe = !key.is_empty() &&
        key.len() <= 64 &&
        key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe {
        key.to_string()
    } else {
        format!("u-{}", hex::encode(Sha256::digest(key.as_bytes())))
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn get_or_create(&self, key: &str) -> Result<Conversation, HistoryError> {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;
        self.load(key, &mut guard).await?;
        Ok(guard.clone().unwrap_or_else(|| Conversation::seeded(key, self.preamble.messages())))
    }

    async fn append(&self, key: &str, message: ChatMessage) -> Result<(), HistoryError> {
        self.update(key, move |conversation| conversation.push(message)).await
    }

    async fn trim(&self, key: &str, max_messages: usize) -> Result<(), HistoryError> {
        self.update(key, move |conversation| conversation.trim(max_messages)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::knowledge::KnowledgeBase;

    fn preamble() -> Arc<Preamble> {
        Arc::new(Preamble::new("Be helpful.", Arc::new(KnowledgeBase::from_text("kb"))))
    }

    #[tokio::test]
    async fn new_conversation_is_written_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path(), preamble()).unwrap();

        store.get_or_create("alice").await.unwrap();

        let saved: Vec<ChatMessage> = serde_json
            ::from_slice(&std::fs::read(dir.path().join("alice.json")).unwrap())
            .unwrap();
        assert_eq!(saved, preamble().messages());
    }

    #[tokio::test]
    async fn history_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileHistoryStore::new(dir.path(), preamble()).unwrap();
            store.append("alice", ChatMessage::user("Hello")).await.unwrap();
            store.append("alice", ChatMessage::assistant("Hi!")).await.unwrap();
        }

        let reopened = FileHistoryStore::new(dir.path(), preamble()).unwrap();
        let conversation = reopened.get_or_create("alice").await.unwrap();
        assert_eq!(conversation.len(), 4);
        assert_eq!(conversation.messages[2], ChatMessage::user("Hello"));
        assert_eq!(conversation.messages[3], ChatMessage::assistant("Hi!"));
    }

    #[tokio::test]
    async fn trim_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path(), preamble()).unwrap();
        for n in 0..12 {
            store.append("u", ChatMessage::user(format!("q{n}"))).await.unwrap();
            store.append("u", ChatMessage::assistant(format!("a{n}"))).await.unwrap();
        }
        store.trim("u", 20).await.unwrap();

        let saved: Vec<ChatMessage> = serde_json
            ::from_slice(&std::fs::read(store.path_for("u")).unwrap())
            .unwrap();
        assert_eq!(saved.len(), 22);
        assert_eq!(saved[2], ChatMessage::user("q2"));
    }

    #[tokio::test]
    async fn corrupt_file_is_replaced_by_a_seeded_conversation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bob.json"), b"{not json").unwrap();
        let store = FileHistoryStore::new(dir.path(), preamble()).unwrap();

        let conversation = store.get_or_create("bob").await.unwrap();
        assert_eq!(conversation.messages, preamble().messages());
    }

    #[test]
    fn unsafe_ids_are_hashed() {
        assert_eq!(file_stem("user_42-a"), "user_42-a");
        let hashed = file_stem("../etc/passwd");
        assert!(hashed.starts_with("u-"));
        assert!(!hashed.contains('/'));
        assert_ne!(file_stem("a b"), file_stem("a_b"));
    }

    #[tokio::test]
    async fn concurrent_appends_for_one_user_keep_every_message() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileHistoryStore::new(dir.path(), preamble()).unwrap());
        let mut handles = Vec::new();
        for n in 0..16 {
            let store = Arc::clone(&store);
            handles.push(
                tokio::spawn(async move {
                    store.append("shared", ChatMessage::user(format!("m{n}"))).await.unwrap();
                })
            );
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let reopened = FileHistoryStore::new(dir.path(), preamble()).unwrap();
        let conversation = reopened.get_or_create("shared").await.unwrap();
        assert_eq!(conversation.history_len(), 16);
    }
}
