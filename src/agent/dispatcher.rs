//! Command and message dispatcher
//!
//! Every unit of work runs the same sequence: set the working status, record
//! the inbound message, pick a reply, record and deliver the reply, clear the
//! status. The status is held by a guard, so it is cleared on every exit path.

use super::behavior::ReplyContext;
use super::config::AgentConfig;
use super::status::{StatusBoard, WORKING_STATUS};
use super::traits::{DeliveryError, HistoryStore, StorageError, Transport};
use crate::db::{Message, NewMessage, Sender};
use crate::moderation::{ModerationGate, ModerationProvider};
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The only command this agent understands
pub const SAY_COMMAND: &str = "say";

/// A named directive sent to the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub params: String,
    pub sender: Sender,
}

impl Command {
    pub fn new(name: impl Into<String>, params: impl Into<String>, sender: Sender) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
            sender,
        }
    }

    pub fn is_say(&self) -> bool {
        self.name.trim().eq_ignore_ascii_case(SAY_COMMAND)
    }

    /// Synthetic history record for a received command
    pub fn to_inbound(&self) -> NewMessage {
        let content = format!("/{} {}", self.name.trim(), self.params);
        NewMessage::new(self.sender.clone(), content.trim_end()).with_debug(serde_json::json!({
            "command": self.name,
            "params": self.params,
        }))
    }
}

/// Why a unit of work produced no reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    CommandsDisabled,
    UnsupportedCommand { name: String },
    /// Sender is another agent and replying to agents is off
    AgentSender,
    EmptyContent,
}

/// Result of a completed dispatch call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A guard stopped the call; `inbound` is set when it had already been recorded
    Skipped {
        reason: SkipReason,
        inbound: Option<Message>,
    },
    /// Inbound recorded, the behavior chose not to reply
    Recorded { inbound: Message },
    Replied { inbound: Message, outbound: Message },
}

impl DispatchOutcome {
    #[allow(dead_code)] // Used in tests
    pub fn outbound(&self) -> Option<&Message> {
        match self {
            DispatchOutcome::Replied { outbound, .. } => Some(outbound),
            _ => None,
        }
    }
}

/// Failures that cross the dispatcher boundary
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("dispatch cancelled")]
    Cancelled,
}

/// Per-agent dispatcher, generic over history, transport and moderation
pub struct Dispatcher<H, T, M>
where
    H: HistoryStore,
    T: Transport,
    M: ModerationProvider,
{
    agent_id: String,
    config: RwLock<Arc<AgentConfig>>,
    history: H,
    transport: T,
    gate: ModerationGate<M>,
    status: Arc<StatusBoard>,
}

impl<H, T, M> Dispatcher<H, T, M>
where
    H: HistoryStore,
    T: Transport,
    M: ModerationProvider,
{
    pub fn new(
        agent_id: impl Into<String>,
        config: AgentConfig,
        history: H,
        transport: T,
        gate: ModerationGate<M>,
        status: Arc<StatusBoard>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            config: RwLock::new(Arc::new(config)),
            history,
            transport,
            gate,
            status,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Immutable snapshot of the current configuration
    pub fn config(&self) -> Arc<AgentConfig> {
        Arc::clone(&self.config.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the configuration; calls already in flight keep their snapshot
    pub fn reconfigure(&self, config: AgentConfig) {
        tracing::info!(
            agent_id = %self.agent_id,
            behavior = %config.behavior,
            commands_enabled = config.commands_enabled,
            reply_to_agents = config.reply_to_agents,
            "Agent reconfigured"
        );
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    pub fn status(&self) -> &Arc<StatusBoard> {
        &self.status
    }

    /// Handle a chat message addressed to the agent
    pub async fn handle_message(
        &self,
        conv_id: &str,
        message: NewMessage,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        let config = self.config();
        self.with_status(conv_id, cancel, self.process_message(conv_id, message, &config))
            .await
    }

    /// Handle a command addressed to the agent
    pub async fn handle_command(
        &self,
        conv_id: &str,
        command: Command,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        let config = self.config();

        if !config.commands_enabled {
            tracing::debug!(conv_id = %conv_id, command = %command.name, "Commands disabled, ignoring");
            return Ok(DispatchOutcome::Skipped {
                reason: SkipReason::CommandsDisabled,
                inbound: None,
            });
        }
        if !command.is_say() {
            tracing::debug!(conv_id = %conv_id, command = %command.name, "Unsupported command, ignoring");
            return Ok(DispatchOutcome::Skipped {
                reason: SkipReason::UnsupportedCommand { name: command.name },
                inbound: None,
            });
        }

        self.with_status(conv_id, cancel, self.process_command(conv_id, command, &config))
            .await
    }

    /// Run `work` while the conversation shows the working status.
    ///
    /// The guard lives for the whole call, so the status is cleared before the
    /// result (or cancellation) reaches the caller.
    async fn with_status<F>(
        &self,
        conv_id: &str,
        cancel: &CancellationToken,
        work: F,
    ) -> Result<DispatchOutcome, DispatchError>
    where
        F: Future<Output = Result<DispatchOutcome, DispatchError>>,
    {
        let _status = self.status.begin(conv_id, WORKING_STATUS);

        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::info!(conv_id = %conv_id, "Dispatch cancelled");
                Err(DispatchError::Cancelled)
            }

            result = work => {
                if let Err(e) = &result {
                    tracing::error!(conv_id = %conv_id, error = %e, "Dispatch failed");
                }
                result
            }
        }
    }

    async fn process_message(
        &self,
        conv_id: &str,
        message: NewMessage,
        config: &AgentConfig,
    ) -> Result<DispatchOutcome, DispatchError> {
        let (inbound, _) = self.history.append(conv_id, &message).await?;

        if !config.reply_to_agents && message.sender.is_assistant() {
            tracing::debug!(conv_id = %conv_id, sender = %message.sender.id, "Not replying to agent");
            return Ok(skipped_after(SkipReason::AgentSender, inbound));
        }

        let behavior = config.behavior;
        if behavior.requires_text() && message.is_blank() {
            return Ok(skipped_after(SkipReason::EmptyContent, inbound));
        }

        let ctx = ReplyContext {
            conversation_id: conv_id,
            agent_id: &self.agent_id,
            gate: &self.gate,
        };
        let reply = behavior.respond(&ctx, &message).await;
        tracing::debug!(
            conv_id = %conv_id,
            behavior = %behavior,
            replied = reply.is_some(),
            "Behavior resolved"
        );

        self.finish(conv_id, inbound, reply).await
    }

    async fn process_command(
        &self,
        conv_id: &str,
        command: Command,
        config: &AgentConfig,
    ) -> Result<DispatchOutcome, DispatchError> {
        let (inbound, _) = self.history.append(conv_id, &command.to_inbound()).await?;

        if !config.reply_to_agents && command.sender.is_assistant() {
            tracing::debug!(conv_id = %conv_id, sender = %command.sender.id, "Not replying to agent");
            return Ok(skipped_after(SkipReason::AgentSender, inbound));
        }

        if command.params.trim().is_empty() {
            return Ok(skipped_after(SkipReason::EmptyContent, inbound));
        }

        let reply = NewMessage::new(Sender::assistant(&self.agent_id), command.params);
        self.finish(conv_id, inbound, Some(reply)).await
    }

    /// Record and deliver the reply, if there is one
    async fn finish(
        &self,
        conv_id: &str,
        inbound: Message,
        reply: Option<NewMessage>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(reply) = reply else {
            return Ok(DispatchOutcome::Recorded { inbound });
        };

        tracing::trace!(conv_id = %conv_id, "Store new message");
        let (outbound, _) = self.history.append(conv_id, &reply).await?;

        tracing::trace!(conv_id = %conv_id, "Send new message");
        self.transport.deliver(conv_id, &outbound).await?;

        Ok(DispatchOutcome::Replied { inbound, outbound })
    }
}

fn skipped_after(reason: SkipReason, inbound: Message) -> DispatchOutcome {
    DispatchOutcome::Skipped {
        reason,
        inbound: Some(inbound),
    }
}
