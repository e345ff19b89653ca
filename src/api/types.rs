//! API request and response types

use crate::agent::AgentConfig;
use crate::db::{ContentType, Conversation, Message, NewMessage, Role, Sender};
use serde::{Deserialize, Serialize};

/// Request to post a chat message to the agent
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub sender_id: String,
    #[serde(default)]
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub content_type: ContentType,
}

impl PostMessageRequest {
    pub fn into_message(self) -> NewMessage {
        NewMessage::new(Sender::new(self.sender_id, self.role), self.content)
            .with_content_type(self.content_type)
    }
}

/// Request to send a command to the agent
#[derive(Debug, Deserialize)]
pub struct PostCommandRequest {
    pub sender_id: String,
    #[serde(default)]
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub params: String,
}

/// Response with a list of conversations
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<Conversation>,
}

/// Response with conversation and messages
#[derive(Debug, Serialize)]
pub struct ConversationWithMessagesResponse {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
    pub agent_status: Option<String>,
}

/// Response for cancel action
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
}

/// Current agent identity and configuration
#[derive(Debug, Serialize)]
pub struct AgentConfigResponse {
    pub agent_id: String,
    pub config: AgentConfig,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
