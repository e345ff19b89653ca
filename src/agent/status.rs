//! Transient per-conversation status signal
//!
//! The board holds at most one status string per conversation. Setting a
//! status hands back a guard; the status is cleared when the guard drops,
//! so every exit from a dispatch call (return, `?`, panic, cancellation,
//! dropped future) resets it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Status shown while a reply is being computed
pub const WORKING_STATUS: &str = "Thinking...";

/// Receives status changes for publication (e.g. to connected clients).
///
/// Status is advisory, so failures are logged by the board and never
/// propagated.
pub trait StatusSink: Send + Sync {
    /// `None` clears the status
    fn publish(&self, conv_id: &str, status: Option<&str>) -> Result<(), String>;
}

impl<T: StatusSink + ?Sized> StatusSink for Arc<T> {
    fn publish(&self, conv_id: &str, status: Option<&str>) -> Result<(), String> {
        (**self).publish(conv_id, status)
    }
}

/// Per-agent map of conversation status
pub struct StatusBoard {
    statuses: Mutex<HashMap<String, String>>,
    sink: Option<Arc<dyn StatusSink>>,
}

impl StatusBoard {
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            sink: Some(sink),
        }
    }

    /// Board that does not publish changes anywhere
    #[allow(dead_code)] // Used in tests
    pub fn detached() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            sink: None,
        }
    }

    fn statuses(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status of a conversation, if any
    pub fn get(&self, conv_id: &str) -> Option<String> {
        self.statuses().get(conv_id).cloned()
    }

    pub fn set(&self, conv_id: &str, status: &str) {
        self.statuses()
            .insert(conv_id.to_string(), status.to_string());
        self.publish(conv_id, Some(status));
    }

    pub fn clear(&self, conv_id: &str) {
        self.statuses().remove(conv_id);
        self.publish(conv_id, None);
    }

    /// Set the status and return a guard that clears it on drop
    pub fn begin(self: &Arc<Self>, conv_id: &str, status: &str) -> StatusGuard {
        self.set(conv_id, status);
        StatusGuard {
            board: Arc::clone(self),
            conv_id: conv_id.to_string(),
        }
    }

    fn publish(&self, conv_id: &str, status: Option<&str>) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = sink.publish(conv_id, status) {
            tracing::warn!(conv_id = %conv_id, error = %e, "Failed to publish agent status");
        }
    }
}

/// Scoped ownership of a conversation's "busy" status
#[must_use = "the status is cleared as soon as the guard is dropped"]
pub struct StatusGuard {
    board: Arc<StatusBoard>,
    conv_id: String,
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        tracing::trace!(conv_id = %self.conv_id, "Reset agent status");
        self.board.clear(&self.conv_id);
    }
}
