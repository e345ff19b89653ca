//! Database module for the workbench agent
//!
//! Provides durable, append-only conversation history.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.lock();
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Conversation Operations ====================

    /// Get conversation by ID
    pub fn get_conversation(&self, id: &str) -> DbResult<Conversation> {
        let conn = self.lock();
        query_conversation(&conn, id)?.ok_or_else(|| DbError::ConversationNotFound(id.to_string()))
    }

    /// List conversations, most recently updated first
    pub fn list_conversations(&self) -> DbResult<Vec<Conversation>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) as message_count
             FROM conversations c
             ORDER BY c.updated_at DESC",
        )?;

        let rows = stmt.query_map([], parse_conversation_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Message Operations ====================

    /// Append a message to a conversation, creating the conversation if needed.
    ///
    /// Assigns the message id, the next sequence id and the creation timestamp.
    /// Returns the stored message together with the updated conversation.
    pub fn append_message(
        &self,
        conversation_id: &str,
        message: &NewMessage,
    ) -> DbResult<(Message, Conversation)> {
        let mut conn = self.lock();
        let now = Utc::now();
        let message_id = uuid::Uuid::new_v4().to_string();
        let debug_str = message
            .debug
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO conversations (id, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![conversation_id, now.to_rfc3339()],
        )?;

        let sequence_id: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sequence_id), 0) + 1 FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO messages (message_id, conversation_id, sequence_id, sender_id, sender_role, content, content_type, debug_data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                message_id,
                conversation_id,
                sequence_id,
                message.sender.id,
                message.sender.role.as_str(),
                message.content,
                message.content_type.as_mime(),
                debug_str,
                now.to_rfc3339(),
            ],
        )?;

        // Update conversation timestamp
        tx.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), conversation_id],
        )?;

        let conversation = query_conversation(&tx, conversation_id)?
            .ok_or_else(|| DbError::ConversationNotFound(conversation_id.to_string()))?;
        tx.commit()?;

        let stored = Message {
            message_id,
            conversation_id: conversation_id.to_string(),
            sequence_id,
            sender: message.sender.clone(),
            content: message.content.clone(),
            content_type: message.content_type,
            debug: message.debug.clone(),
            created_at: now,
        };

        Ok((stored, conversation))
    }

    /// Get messages for a conversation in insertion order
    pub fn get_messages(&self, conversation_id: &str) -> DbResult<Vec<Message>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT message_id, conversation_id, sequence_id, sender_id, sender_role, content, content_type, debug_data, created_at
             FROM messages WHERE conversation_id = ?1 ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id], parse_message_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Get messages after a sequence ID
    pub fn get_messages_after(
        &self,
        conversation_id: &str,
        after_sequence: i64,
    ) -> DbResult<Vec<Message>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT message_id, conversation_id, sequence_id, sender_id, sender_role, content, content_type, debug_data, created_at
             FROM messages WHERE conversation_id = ?1 AND sequence_id > ?2 ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id, after_sequence], parse_message_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Get the last sequence ID for a conversation
    pub fn get_last_sequence_id(&self, conversation_id: &str) -> DbResult<i64> {
        let conn = self.lock();
        conn.query_row(
            "SELECT COALESCE(MAX(sequence_id), 0) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )
        .map_err(DbError::from)
    }
}

fn query_conversation(conn: &Connection, id: &str) -> DbResult<Option<Conversation>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.created_at, c.updated_at,
                (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) as message_count
         FROM conversations c WHERE c.id = ?1",
    )?;

    stmt.query_row(params![id], parse_conversation_row)
        .optional()
        .map_err(DbError::from)
}

fn parse_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        created_at: parse_datetime(&row.get::<_, String>(1)?),
        updated_at: parse_datetime(&row.get::<_, String>(2)?),
        message_count: row.get(3)?,
    })
}

/// Parse a message row from the database
fn parse_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        message_id: row.get(0)?,
        conversation_id: row.get(1)?,
        sequence_id: row.get(2)?,
        sender: Sender {
            id: row.get(3)?,
            role: Role::parse(&row.get::<_, String>(4)?),
        },
        content: row.get(5)?,
        content_type: ContentType::from_mime(&row.get::<_, String>(6)?),
        debug: row
            .get::<_, Option<String>>(7)?
            .and_then(|s| serde_json::from_str(&s).ok()),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
