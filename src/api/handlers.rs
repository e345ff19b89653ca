//! HTTP request handlers

use super::sse::{sse_stream, InitSnapshot};
use super::types::{
    AgentConfigResponse, CancelResponse, ConversationListResponse,
    ConversationWithMessagesResponse, ErrorResponse, PostCommandRequest, PostMessageRequest,
};
use super::AppState;
use crate::agent::{AgentConfig, Command, DispatchError, DispatchOutcome};
use crate::db::{DbError, Sender};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // History
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/:id", get(get_conversation))
        // SSE streaming
        .route("/api/conversations/:id/stream", get(stream_conversation))
        // Dispatch
        .route("/api/conversations/:id/messages", post(post_message))
        .route("/api/conversations/:id/commands", post(post_command))
        .route("/api/conversations/:id/cancel", post(cancel_conversation))
        // Agent configuration
        .route(
            "/api/agent/config",
            get(get_agent_config).put(put_agent_config),
        )
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// History
// ============================================================

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<ConversationListResponse>, AppError> {
    let conversations = state.db.list_conversations()?;
    Ok(Json(ConversationListResponse { conversations }))
}

#[derive(Debug, Deserialize)]
struct GetConversationQuery {
    after_sequence: Option<i64>,
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<GetConversationQuery>,
) -> Result<Json<ConversationWithMessagesResponse>, AppError> {
    let conversation = state.db.get_conversation(&id)?;

    let messages = if let Some(after) = query.after_sequence {
        state.db.get_messages_after(&id, after)
    } else {
        state.db.get_messages(&id)
    }?;

    Ok(Json(ConversationWithMessagesResponse {
        conversation,
        messages,
        agent_status: state.dispatcher.status().get(&id),
    }))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // Subscribe before reading the snapshot so nothing falls in between
    let subscription = state.hub.subscribe(&id);

    let conversation = match state.db.get_conversation(&id) {
        Ok(conversation) => Some(conversation),
        Err(DbError::ConversationNotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };
    let messages = state.db.get_messages(&id)?;
    let last_sequence_id = state.db.get_last_sequence_id(&id)?;

    let init = InitSnapshot {
        conversation,
        messages,
        agent_status: state.dispatcher.status().get(&id),
        last_sequence_id,
    };

    Ok(sse_stream(init, subscription))
}

// ============================================================
// Dispatch
// ============================================================

async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<DispatchOutcome>, AppError> {
    let call = state.in_flight.start(&id);
    let outcome = state
        .dispatcher
        .handle_message(&id, req.into_message(), call.token())
        .await?;
    Ok(Json(outcome))
}

async fn post_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PostCommandRequest>,
) -> Result<Json<DispatchOutcome>, AppError> {
    let command = Command::new(req.name, req.params, Sender::new(req.sender_id, req.role));
    let call = state.in_flight.start(&id);
    let outcome = state
        .dispatcher
        .handle_command(&id, command, call.token())
        .await?;
    Ok(Json(outcome))
}

async fn cancel_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<CancelResponse> {
    let ok = state.in_flight.cancel(&id);
    tracing::info!(conv_id = %id, cancelled = ok, "Cancel requested");
    Json(CancelResponse { ok })
}

// ============================================================
// Agent Configuration
// ============================================================

async fn get_agent_config(State(state): State<AppState>) -> Json<AgentConfigResponse> {
    Json(AgentConfigResponse {
        agent_id: state.dispatcher.agent_id().to_string(),
        config: (*state.dispatcher.config()).clone(),
    })
}

async fn put_agent_config(
    State(state): State<AppState>,
    Json(config): Json<AgentConfig>,
) -> Json<AgentConfigResponse> {
    state.dispatcher.reconfigure(config);
    get_agent_config(State(state)).await
}

async fn get_version() -> &'static str {
    concat!("workbench-agent ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::ConversationNotFound(_) => AppError::NotFound(e.to_string()),
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Cancelled => AppError::Conflict(e.to_string()),
            DispatchError::Storage(_) | DispatchError::Delivery(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
