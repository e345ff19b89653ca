//! Per-conversation broadcast channels
//!
//! The hub is the production transport: delivered messages and status
//! changes are fanned out to every SSE subscriber of the conversation.

use crate::agent::{DeliveryError, StatusSink, Transport};
use crate::db::Message;
use async_trait::async_trait;
use serde::Serialize;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

const CHANNEL_CAPACITY: usize = 128;

/// Event pushed to stream subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Message { message: Message },
    /// `None` means the agent is idle
    Status { status: Option<String> },
}

#[derive(Default)]
pub struct ChannelHub {
    channels: Mutex<HashMap<String, broadcast::Sender<StreamEvent>>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<StreamEvent>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to a conversation. The channel is released with its last subscription.
    pub fn subscribe(self: &Arc<Self>, conv_id: &str) -> Subscription {
        let rx = self
            .channels()
            .entry(conv_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        Subscription {
            hub: Arc::clone(self),
            conv_id: conv_id.to_string(),
            events: Some(BroadcastStream::new(rx)),
        }
    }

    fn release(&self, conv_id: &str) {
        let mut channels = self.channels();
        if channels.get(conv_id).is_some_and(|s| s.receiver_count() == 0) {
            channels.remove(conv_id);
        }
    }

    /// Send to current subscribers, returning how many received it.
    ///
    /// Channels without subscribers are dropped.
    pub fn broadcast(&self, conv_id: &str, event: StreamEvent) -> usize {
        let mut channels = self.channels();
        let Some(sender) = channels.get(conv_id) else {
            return 0;
        };
        if let Ok(count) = sender.send(event) {
            count
        } else {
            channels.remove(conv_id);
            0
        }
    }
}

/// Event stream for one conversation
pub struct Subscription {
    hub: Arc<ChannelHub>,
    conv_id: String,
    events: Option<BroadcastStream<StreamEvent>>,
}

impl Stream for Subscription {
    type Item = Result<StreamEvent, BroadcastStreamRecvError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.events.as_mut() {
            Some(events) => Pin::new(events).poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The receiver must be gone before the count is checked
        drop(self.events.take());
        self.hub.release(&self.conv_id);
    }
}

#[async_trait]
impl Transport for ChannelHub {
    async fn deliver(&self, conv_id: &str, message: &Message) -> Result<(), DeliveryError> {
        let receivers = self.broadcast(
            conv_id,
            StreamEvent::Message {
                message: message.clone(),
            },
        );
        tracing::debug!(conv_id = %conv_id, receivers, "Delivered message");
        Ok(())
    }
}

impl StatusSink for ChannelHub {
    fn publish(&self, conv_id: &str, status: Option<&str>) -> Result<(), String> {
        self.broadcast(
            conv_id,
            StreamEvent::Status {
                status: status.map(str::to_string),
            },
        );
        Ok(())
    }
}
