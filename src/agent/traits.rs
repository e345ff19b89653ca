//! Trait abstractions for dispatcher I/O
//!
//! These traits enable testing the dispatcher with mock implementations.

use crate::db::{Conversation, Database, DbError, Message, NewMessage};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Appending to conversation history failed
#[derive(Debug, Clone, Error)]
#[error("storage error: {message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<DbError> for StorageError {
    fn from(e: DbError) -> Self {
        Self::new(e.to_string())
    }
}

/// Sending an outbound message failed
#[derive(Debug, Clone, Error)]
#[error("delivery error: {message}")]
pub struct DeliveryError {
    pub message: String,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Append-only conversation history
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a message, creating the conversation if it does not exist yet
    async fn append(
        &self,
        conv_id: &str,
        message: &NewMessage,
    ) -> Result<(Message, Conversation), StorageError>;

    /// Get all messages for a conversation
    #[allow(dead_code)] // API completeness
    async fn messages(&self, conv_id: &str) -> Result<Vec<Message>, StorageError>;
}

/// Outbound side of the connector
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, conv_id: &str, message: &Message) -> Result<(), DeliveryError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    async fn append(
        &self,
        conv_id: &str,
        message: &NewMessage,
    ) -> Result<(Message, Conversation), StorageError> {
        (**self).append(conv_id, message).await
    }

    async fn messages(&self, conv_id: &str) -> Result<Vec<Message>, StorageError> {
        (**self).messages(conv_id).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn deliver(&self, conv_id: &str, message: &Message) -> Result<(), DeliveryError> {
        (**self).deliver(conv_id, message).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a history store
#[derive(Clone)]
pub struct DatabaseHistory {
    db: Database,
}

impl DatabaseHistory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HistoryStore for DatabaseHistory {
    async fn append(
        &self,
        conv_id: &str,
        message: &NewMessage,
    ) -> Result<(Message, Conversation), StorageError> {
        self.db
            .append_message(conv_id, message)
            .map_err(StorageError::from)
    }

    async fn messages(&self, conv_id: &str) -> Result<Vec<Message>, StorageError> {
        self.db.get_messages(conv_id).map_err(StorageError::from)
    }
}
