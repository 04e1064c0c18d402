pub mod api;
pub mod cookie;

use crate::agent::RelayAgent;
use crate::cli::Args;
use api::AppState;
use cookie::SessionCookies;
use log::{ info, warn };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    addr: String,
    agent: Arc<RelayAgent>,
    args: Args,
}

impl Server {
    pub fn new(addr: String, agent: Arc<RelayAgent>, args: Args) -> Self {
        Self { addr, agent, args }
    }

    fn session_cookies(&self) -> Option<SessionCookies> {
        if !self.args.is_session_backed() {
            return None;
        }
        if self.args.session_secret_key.is_empty() {
            warn!("SESSION_SECRET_KEY is not set; session cookies are signed with an empty key.");
        }
        info!("Conversations are keyed by the '{}' cookie", cookie::SESSION_COOKIE);
        Some(
            SessionCookies::new(
                &self.args.session_secret_key,
                Duration::from_secs(self.args.session_idle_secs)
            )
        )
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid server address '{}': {}", self.addr, e))?;
        let state = AppState::new(Arc::clone(&self.agent), self.session_cookies());
        api::start_http_server(addr, state).await
    }
}
