//! Agent dispatch engine
//!
//! Receives commands and chat messages for a conversation, records them,
//! picks a reply according to the configured behavior, and sends the reply
//! back through the transport.

mod behavior;
mod config;
mod dispatcher;
mod samples;
mod status;
mod traits;

#[cfg(test)]
mod proptests;

#[allow(unused_imports)] // Public API re-exports
pub use {
    behavior::{reverse_text, Behavior},
    config::{AgentConfig, DEFAULT_AGENT_ID},
    dispatcher::{Command, DispatchError, DispatchOutcome, Dispatcher, SkipReason},
    status::{StatusBoard, StatusSink, WORKING_STATUS},
    traits::{DatabaseHistory, DeliveryError, HistoryStore, StorageError, Transport},
};
