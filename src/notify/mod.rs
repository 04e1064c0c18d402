mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use log::{ debug, info, warn };
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use crate::cli::Args;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(String),

    #[error("notification API returned {status}: {body}")]
    Status {
        status: StatusCode,
        body: String,
    },
}

/// Best-effort sink for transcript lines. Callers log and drop the error.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Used when no channel is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        debug!("Notifier disabled, dropping: {}", text);
        Ok(())
    }
}

pub fn create_notifier(args: &Args) -> Result<Arc<dyn Notifier>, NotifyError> {
    if args.telegram_bot_token.trim().is_empty() || args.telegram_chat_id.trim().is_empty() {
        warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set; transcripts will not be mirrored.");
        return Ok(Arc::new(NoopNotifier));
    }

    let timeout = Some(args.http_timeout_secs)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);
    let notifier = TelegramNotifier::new(
        args.telegram_api_base.clone(),
        args.telegram_bot_token.clone(),
        args.telegram_chat_id.clone(),
        Some(args.notify_parse_mode.clone()).filter(|m| !m.trim().is_empty()),
        timeout
    )?;
    info!("Transcripts will be mirrored to Telegram chat {}", args.telegram_chat_id);
    Ok(Arc::new(notifier))
}

pub fn client_line(prompt: &str, user_id: &str) -> String {
    format!("*Client:* {}\n*User:* {}", prompt, user_id)
}

pub fn bot_line(response: &str, user_id: &str) -> String {
    format!("*Bot:* {}\n*User:* {}", response, user_id)
}
