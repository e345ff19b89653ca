//! Server-Sent Events support

use super::hub::{StreamEvent, Subscription};
use crate::db::{Conversation, Message};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::StreamExt;

/// Snapshot sent as the first event of every stream
#[derive(Debug)]
pub struct InitSnapshot {
    pub conversation: Option<Conversation>,
    pub messages: Vec<Message>,
    pub agent_status: Option<String>,
    pub last_sequence_id: i64,
}

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init: InitSnapshot,
    subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(init_event(init)) });

    let broadcasts = subscription.filter_map(|result| match result {
        Ok(event) => Some(Ok(stream_event_to_axum(&event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn init_event(init: InitSnapshot) -> Event {
    let data = json!({
        "type": "init",
        "conversation": init.conversation,
        "messages": init.messages,
        "agent_status": init.agent_status,
        "last_sequence_id": init.last_sequence_id,
    });
    Event::default().event("init").data(data.to_string())
}

fn stream_event_to_axum(event: &StreamEvent) -> Event {
    let event_type = match event {
        StreamEvent::Message { .. } => "message",
        StreamEvent::Status { .. } => "status",
    };
    let data = serde_json::to_string(event).unwrap_or_default();
    Event::default().event(event_type).data(data)
}
