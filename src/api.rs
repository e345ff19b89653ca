//! HTTP API for the agent
//!
//! Exposes the dispatcher over JSON endpoints and streams delivered messages
//! and status changes over SSE.

mod handlers;
mod hub;
mod sse;
mod types;

pub use handlers::create_router;
pub use hub::ChannelHub;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::agent::{AgentConfig, DatabaseHistory, Dispatcher, StatusBoard};
use crate::db::Database;
use crate::moderation::{ModerationGate, ModerationProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Dispatcher wired to the production adapters
pub type AgentDispatcher =
    Dispatcher<DatabaseHistory, Arc<ChannelHub>, Arc<dyn ModerationProvider>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<AgentDispatcher>,
    pub db: Database,
    pub hub: Arc<ChannelHub>,
    pub in_flight: Arc<InFlightCalls>,
}

impl AppState {
    pub fn new(
        agent_id: impl Into<String>,
        config: AgentConfig,
        db: Database,
        moderation: Arc<dyn ModerationProvider>,
    ) -> Self {
        let hub = Arc::new(ChannelHub::new());
        let status = Arc::new(StatusBoard::new(hub.clone()));
        let dispatcher = Dispatcher::new(
            agent_id,
            config,
            DatabaseHistory::new(db.clone()),
            hub.clone(),
            ModerationGate::new(moderation),
            status,
        );

        Self {
            dispatcher: Arc::new(dispatcher),
            db,
            hub,
            in_flight: Arc::new(InFlightCalls::default()),
        }
    }
}

/// Cancellation tokens of dispatch calls currently running, per conversation
#[derive(Default)]
pub struct InFlightCalls {
    next_id: AtomicU64,
    calls: Mutex<HashMap<String, Vec<(u64, CancellationToken)>>>,
}

impl InFlightCalls {
    fn calls(&self) -> MutexGuard<'_, HashMap<String, Vec<(u64, CancellationToken)>>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a call; it is unregistered when the returned handle drops
    pub fn start(self: &Arc<Self>, conv_id: &str) -> InFlightCall {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.calls()
            .entry(conv_id.to_string())
            .or_default()
            .push((id, token.clone()));
        InFlightCall {
            registry: Arc::clone(self),
            conv_id: conv_id.to_string(),
            id,
            token,
        }
    }

    /// Cancel every running call for the conversation.
    /// Returns whether anything was running.
    pub fn cancel(&self, conv_id: &str) -> bool {
        let Some(calls) = self.calls().remove(conv_id) else {
            return false;
        };
        for (_, token) in &calls {
            token.cancel();
        }
        !calls.is_empty()
    }

    fn finish(&self, conv_id: &str, id: u64) {
        let mut calls = self.calls();
        if let Some(list) = calls.get_mut(conv_id) {
            list.retain(|(call_id, _)| *call_id != id);
            if list.is_empty() {
                calls.remove(conv_id);
            }
        }
    }
}

/// Registration of one running dispatch call
pub struct InFlightCall {
    registry: Arc<InFlightCalls>,
    conv_id: String,
    id: u64,
    token: CancellationToken,
}

impl InFlightCall {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InFlightCall {
    fn drop(&mut self) {
        self.registry.finish(&self.conv_id, self.id);
    }
}
