use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use crate::config::prompt::Preamble;
use crate::history::{ HistoryError, HistoryStore };
use crate::models::chat::{ ChatMessage, Conversation };

struct SessionEntry {
    conversation: Conversation,
    last_seen: Instant,
}

/// Conversations keyed by session id that expire after an idle period.
/// Expired entries read as absent and are dropped by [`spawn_sweeper`].
///
/// [`spawn_sweeper`]: SessionHistoryStore::spawn_sweeper
pub struct SessionHistoryStore {
    sessions: DashMap<String, SessionEntry>,
    preamble: Arc<Preamble>,
    idle_timeout: Duration,
}

impl SessionHistoryStore {
    pub fn new(preamble: Arc<Preamble>, idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            preamble,
            idle_timeout,
        }
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    fn is_expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.duration_since(entry.last_seen) > self.idle_timeout
    }

    fn seed(&self, key: &str, now: Instant) -> SessionEntry {
        SessionEntry {
            conversation: Conversation::seeded(key, self.preamble.messages()),
            last_seen: now,
        }
    }

    /// Runs `f` on the live entry for `key`, replacing an expired one first.
    fn with_entry<T>(&self, key: &str, f: impl FnOnce(&mut Conversation) -> T) -> T {
        let now = Instant::now();
        let mut entry = self.sessions.entry(key.to_string()).or_insert_with(|| self.seed(key, now));
        if self.is_expired(&entry, now) {
            debug!("Session {} expired, starting a new conversation", key);
            *entry = self.seed(key, now);
        }
        entry.last_seen = now;
        f(&mut entry.conversation)
    }

    /// Removes every expired session and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.sessions.len())
    }

    /// Sweeps on a fixed interval until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = store.sweep();
                if removed > 0 {
                    debug!("Swept {} idle sessions, {} active", removed, store.active_count());
                }
            }
        })
    }
}

#[async_trait]
impl HistoryStore for SessionHistoryStore {
    async fn get_or_create(&self, key: &str) -> Result<Conversation, HistoryError> {
        Ok(self.with_entry(key, |conversation| conversation.clone()))
    }

    async fn append(&self, key: &str, message: ChatMessage) -> Result<(), HistoryError> {
        self.with_entry(key, |conversation| conversation.push(message));
        Ok(())
    }

    async fn trim(&self, key: &str, max_messages: usize) -> Result<(), HistoryError> {
        self.with_entry(key, |conversation| conversation.trim(max_messages));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::knowledge::KnowledgeBase;

    fn store(idle: Duration) -> Arc<SessionHistoryStore> {
        let preamble = Preamble::new("Be helpful.", Arc::new(KnowledgeBase::from_text("kb")));
        Arc::new(SessionHistoryStore::new(Arc::new(preamble), idle))
    }

    #[tokio::test(start_paused = true)]
    async fn activity_keeps_a_session_alive() {
        let store = store(Duration::from_secs(60));
        store.append("s1", ChatMessage::user("hello")).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        store.append("s1", ChatMessage::assistant("hi")).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;

        let conversation = store.get_or_create("s1").await.unwrap();
        assert_eq!(conversation.history_len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_starts_over() {
        let store = store(Duration::from_secs(60));
        store.append("s1", ChatMessage::user("hello")).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        let conversation = store.get_or_create("s1").await.unwrap();
        assert_eq!(conversation.history_len(), 0);
        assert_eq!(conversation.system_messages().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_only_idle_sessions() {
        let store = store(Duration::from_secs(60));
        store.get_or_create("old").await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;
        store.get_or_create("fresh").await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.active_count(), 1);
        assert_eq!(store.get_or_create("fresh").await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_runs_periodically() {
        let store = store(Duration::from_secs(10));
        let handle = store.spawn_sweeper(Duration::from_secs(5));
        store.get_or_create("s").await.unwrap();

        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(5)).await;
            tokio::task::yield_now().await;
        }

        assert_eq!(store.active_count(), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn trim_bounds_session_history() {
        let store = store(Duration::from_secs(600));
        for n in 0..25 {
            store.append("s", ChatMessage::user(format!("q{n}"))).await.unwrap();
            store.append("s", ChatMessage::assistant(format!("a{n}"))).await.unwrap();
            store.trim("s", 20).await.unwrap();
        }
        let conversation = store.get_or_create("s").await.unwrap();
        assert_eq!(conversation.history_len(), 20);
        assert_eq!(conversation.system_messages().count(), 2);
    }
}
