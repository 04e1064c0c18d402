pub mod agent;
pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;
pub mod notify;

use agent::RelayAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

fn secret_state(value: &str) -> &'static str {
    if value.is_empty() { "unset" } else { "set" }
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model);
    info!("Chat API Key: {}", secret_state(&args.chat_api_key));
    info!("Markup Formatting: {}", args.format_markup);
    info!("Knowledge Path: {}", args.knowledge_path);
    info!("History Store Type: {}", args.history_type);
    info!("History Window: {}", args.history_window);
    if args.is_session_backed() {
        info!("Session Idle Timeout: {}s", args.session_idle_secs);
        info!("Session Secret Key: {}", secret_state(&args.session_secret_key));
    }
    info!("Telegram Bot Token: {}", secret_state(&args.telegram_bot_token));
    info!("Telegram Chat Id: {}", secret_state(&args.telegram_chat_id));
    info!("-------------------------");

    let agent = Arc::new(RelayAgent::new(&args).await?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
