use crate::agent::{ RelayAgent, ANONYMOUS_USER };
use crate::models::api::{ ChatRequest, ChatResponse, PingResponse };
use crate::server::cookie::SessionCookies;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ State, rejection::JsonRejection },
    response::{ IntoResponse, Response },
    http::{ HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE },
};
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn };

pub const NO_PROMPT_RESPONSE: &str = "No prompt provided";

#[derive(Clone)]
pub struct AppState {
    agent: Arc<RelayAgent>,
    sessions: Option<SessionCookies>,
}

impl AppState {
    /// `sessions` switches conversation keys from the request's user id to
    /// the signed session cookie.
    pub fn new(agent: Arc<RelayAgent>, sessions: Option<SessionCookies>) -> Self {
        Self { agent, sessions }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/chat", post(chat_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: SocketAddr,
    state: AppState
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
    })?;
    info!("HTTP server listening on: http://{}", listener.local_addr()?);

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn ping_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(PingResponse { message: "Server is awake".into() }))
}

fn no_prompt() -> Response {
    (StatusCode::BAD_REQUEST, Json(ChatResponse { response: NO_PROMPT_RESPONSE.into() })).into_response()
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected chat request: {}", rejection.body_text());
            return no_prompt();
        }
    };

    let prompt = match request.prompt {
        Some(prompt) if !prompt.trim().is_empty() => prompt,
        _ => {
            return no_prompt();
        }
    };
    let user_id = request.user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| ANONYMOUS_USER.to_string());

    let session = state.sessions.as_ref().map(|cookies| {
        let (id, fresh) = cookies.resolve(&headers);
        if fresh {
            info!("Started session {} for {}", id, user_id);
        }
        let cookie = cookies.set_cookie(&id);
        (id, cookie)
    });
    let conversation_key = match &session {
        Some((id, _)) => id.clone(),
        None => user_id.clone(),
    };

    let response = state.agent.process_message(&conversation_key, &user_id, &prompt).await;

    let mut http_response = Json(ChatResponse { response }).into_response();
    if let Some((_, cookie)) = session {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                http_response.headers_mut().insert(SET_COOKIE, value);
            }
            Err(e) => warn!("Could not encode session cookie: {}", e),
        }
    }
    http_response
}
