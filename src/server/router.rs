//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use super::auth::{AuthenticatedUser, JwtVerifier, auth_middleware};
use crate::Error;
use crate::analytics::ENDPOINTS;
use crate::pipeline::{GraphSpec, Pipeline};
use crate::store::{ChatMessage, ChatRole, ConversationStore};

/// Shared application state
pub struct AppState {
    /// Query pipeline
    pub pipeline: Arc<Pipeline>,
    /// Chat history
    pub store: Arc<dyn ConversationStore>,
    /// Token verifier for `/chats`
    pub auth: Arc<JwtVerifier>,
    /// Request body cap in bytes
    pub max_body_size: usize,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth = Arc::clone(&state.auth);

    let chats = Router::new()
        .route("/chats", post(save_chat_handler).get(list_chats_handler))
        .route("/chats/{session_id}", get(get_chat_handler))
        .layer(middleware::from_fn_with_state(auth, auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .route("/query", post(query_handler))
        .route("/summarize", post(summarize_handler))
        .route("/heading", post(heading_handler))
        .route("/endpoints", get(endpoints_handler))
        .merge(chats)
        .layer(DefaultBodyLimit::max(state.max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Convert a pipeline or store failure into a JSON error body, logging it
fn error_response(err: &Error) -> Response {
    let status = err.status_code();
    let body = match err {
        Error::Routing { message, raw } => {
            error!(error = %message, raw = %raw, "Intent routing failed");
            json!({ "error": err.to_string(), "raw": raw })
        }
        Error::Gateway { status, body } => {
            error!(upstream_status = status, "Analytics provider error");
            json!({ "error": err.to_string(), "status": status, "message": body })
        }
        _ if status.is_server_error() => {
            error!(error = %err, "Request failed");
            json!({ "error": err.to_string() })
        }
        _ => {
            warn!(error = %err, status = status.as_u16(), "Request rejected");
            json!({ "error": err.to_string() })
        }
    };
    (status, Json(body)).into_response()
}

fn bad_request(message: &str) -> Response {
    error_response(&Error::Validation(message.to_string()))
}

/// Decode a JSON request body. Any body that is not the expected JSON is a
/// 400 with an `{error}` body, whatever the `Content-Type` says.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| bad_request(&format!("Invalid JSON body: {e}")))
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryRequest {
    query: String,
}

/// POST /query: route, fetch and summarize one question
async fn query_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: QueryRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };
    if request.query.trim().is_empty() {
        return bad_request("Missing query field");
    }
    match state.pipeline.query(&request.query).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummarizeRequest {
    question: String,
    query: String,
}

/// POST /summarize: plain-text answer to `question` from the data behind `query`
async fn summarize_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: SummarizeRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };
    match state
        .pipeline
        .answer(&request.question, &request.query)
        .await
    {
        Ok(summary) => Json(json!({ "summary": summary })).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /heading
async fn heading_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: QueryRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };
    match state.pipeline.heading(&request.query).await {
        Ok(heading) => Json(json!({ "heading": heading })).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /endpoints: the static endpoint table
async fn endpoints_handler() -> impl IntoResponse {
    Json(json!({ "endpoints": &ENDPOINTS[..] }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SaveChatRequest {
    session_id: Option<String>,
    heading: Option<String>,
    role: Option<ChatRole>,
    content: Option<String>,
    time: Option<String>,
    graph: Option<GraphSpec>,
}

/// POST /chats: append to a session, or start one when no id is given
async fn save_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    body: Bytes,
) -> Response {
    let request: SaveChatRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };
    let (Some(role), Some(content), Some(time)) = (
        request.role,
        request.content.filter(|c| !c.is_empty()),
        request.time.filter(|t| !t.is_empty()),
    ) else {
        return bad_request("role, content, and time are required");
    };
    let message = ChatMessage {
        role,
        content,
        time,
        graph: request.graph,
    };

    if let Some(session_id) = request.session_id.filter(|s| !s.is_empty()) {
        return match state
            .store
            .append_message(&user.id, &session_id, message)
            .await
        {
            Ok(()) => Json(json!({
                "message": "Message added to session",
                "sessionId": session_id,
            }))
            .into_response(),
            Err(e) => error_response(&e),
        };
    }

    let Some(heading) = request.heading.filter(|h| !h.trim().is_empty()) else {
        return bad_request("Heading is required for new session");
    };
    match state.store.create_session(&user.id, &heading, message).await {
        Ok(session_id) => {
            info!(user = %user.id, session = %session_id, "New chat session");
            Json(json!({
                "message": "New session created",
                "sessionId": session_id,
            }))
            .into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// GET /chats: session list for the caller
async fn list_chats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Response {
    match state.store.list_sessions(&user.id).await {
        Ok(sessions) => Json(json!({ "sessions": sessions })).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /chats/{session_id}
async fn get_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(session_id): Path<String>,
) -> Response {
    match state.store.get_session(&user.id, &session_id).await {
        Ok(session) => Json(json!({
            "heading": session.heading,
            "createdAt": session.created_at,
            "messages": session.messages,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}
