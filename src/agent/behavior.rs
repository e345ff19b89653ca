//! Behavior registry and response strategies
//!
//! Behaviors form a closed set resolved by name. Each one turns an inbound
//! message into zero or one outbound message.

use super::samples;
use crate::db::{ContentType, NewMessage, Sender};
use crate::moderation::{ModerationGate, ModerationProvider};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const INPUT_REFUSAL: &str = "I'm not sure how to respond to that.";
pub const OUTPUT_REFUSAL: &str = "Sorry I won't process that.";
pub const ANALYSIS_FAILED: &str = "Sorry, something went wrong, I couldn't analyze the message.";
pub const ANALYSIS_FAILED_DIAGNOSTIC: &str = "Content safety request failed and returned NULL";
pub const OFFENSIVE_CONTENT: &str = "Offensive content detected";
pub const CONTENT_OK: &str = "OK";

/// Response strategy selected by the agent configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Behavior {
    Echo,
    Reverse,
    SafetyCheck,
    MarkdownSample,
    HtmlSample,
    CodeSample,
    JsonSample,
    MermaidSample,
    MusicSample,
    #[default]
    None,
}

/// Lookup table from configured name to behavior
const REGISTRY: &[(&str, Behavior)] = &[
    ("echo", Behavior::Echo),
    ("reverse", Behavior::Reverse),
    ("safety check", Behavior::SafetyCheck),
    ("markdown sample", Behavior::MarkdownSample),
    ("html sample", Behavior::HtmlSample),
    ("code sample", Behavior::CodeSample),
    ("json sample", Behavior::JsonSample),
    ("mermaid sample", Behavior::MermaidSample),
    ("music sample", Behavior::MusicSample),
    ("none", Behavior::None),
];

/// Everything a behavior needs besides the inbound message
pub struct ReplyContext<'a, M: ModerationProvider> {
    pub conversation_id: &'a str,
    pub agent_id: &'a str,
    pub gate: &'a ModerationGate<M>,
}

impl<M: ModerationProvider> ReplyContext<'_, M> {
    fn reply(&self, content: impl Into<String>) -> NewMessage {
        NewMessage::new(Sender::assistant(self.agent_id), content)
    }
}

impl Behavior {
    /// Case-insensitive lookup; unknown names resolve to `None`
    pub fn resolve(name: &str) -> Self {
        let wanted = name.trim();
        REGISTRY
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(wanted))
            .map_or(Behavior::None, |(_, b)| *b)
    }

    pub fn name(self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, b)| *b == self)
            .map_or("none", |(n, _)| n)
    }

    #[allow(dead_code)] // Used in tests
    pub fn all() -> impl Iterator<Item = Behavior> {
        REGISTRY.iter().map(|(_, b)| *b)
    }

    /// Behaviors that ignore blank messages instead of answering them
    pub fn requires_text(self) -> bool {
        matches!(
            self,
            Behavior::Echo | Behavior::Reverse | Behavior::JsonSample
        )
    }

    /// Produce the reply for an inbound message, if any
    pub async fn respond<M: ModerationProvider>(
        self,
        ctx: &ReplyContext<'_, M>,
        inbound: &NewMessage,
    ) -> Option<NewMessage> {
        match self {
            Behavior::Echo => Some(echo(ctx, inbound).await),
            Behavior::Reverse => Some(reverse(ctx, inbound).await),
            Behavior::SafetyCheck => Some(safety_check(ctx, inbound).await),
            Behavior::MarkdownSample => Some(
                ctx.reply(samples::MARKDOWN_SAMPLE)
                    .with_content_type(ContentType::Markdown),
            ),
            Behavior::HtmlSample => {
                Some(ctx.reply(samples::HTML_SAMPLE).with_content_type(ContentType::Html))
            }
            Behavior::CodeSample => Some(ctx.reply(samples::CODE_SAMPLE)),
            Behavior::JsonSample => {
                Some(ctx.reply(samples::JSON_SAMPLE).with_content_type(ContentType::Json))
            }
            Behavior::MermaidSample => Some(ctx.reply(samples::MERMAID_SAMPLE)),
            Behavior::MusicSample => Some(ctx.reply(samples::MUSIC_SAMPLE)),
            Behavior::None => None,
        }
    }
}

impl From<String> for Behavior {
    fn from(name: String) -> Self {
        Behavior::resolve(&name)
    }
}

impl From<Behavior> for String {
    fn from(behavior: Behavior) -> Self {
        behavior.name().to_string()
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reverse the characters of a string
pub fn reverse_text(text: &str) -> String {
    text.chars().rev().collect()
}

async fn echo<M: ModerationProvider>(
    ctx: &ReplyContext<'_, M>,
    inbound: &NewMessage,
) -> NewMessage {
    let screening = ctx.gate.screen(&inbound.content).await;
    if screening.is_safe() {
        ctx.reply(inbound.content.clone())
    } else {
        tracing::info!(conv_id = %ctx.conversation_id, "Refusing to echo unsafe input");
        ctx.reply(INPUT_REFUSAL).with_debug(screening.debug_attachment())
    }
}

async fn reverse<M: ModerationProvider>(
    ctx: &ReplyContext<'_, M>,
    inbound: &NewMessage,
) -> NewMessage {
    let input = ctx.gate.screen(&inbound.content).await;
    if !input.is_safe() {
        tracing::info!(conv_id = %ctx.conversation_id, "Refusing to reverse unsafe input");
        return ctx.reply(INPUT_REFUSAL).with_debug(input.debug_attachment());
    }

    let reversed = reverse_text(&inbound.content);
    let output = ctx.gate.screen(&reversed).await;
    if output.is_safe() {
        ctx.reply(reversed)
    } else {
        tracing::info!(conv_id = %ctx.conversation_id, "Reversed text failed moderation");
        ctx.reply(OUTPUT_REFUSAL).with_debug(output.debug_attachment())
    }
}

async fn safety_check<M: ModerationProvider>(
    ctx: &ReplyContext<'_, M>,
    inbound: &NewMessage,
) -> NewMessage {
    match ctx.gate.analyze(&inbound.content).await {
        Ok(verdict) => {
            let text = if verdict.is_safe() {
                CONTENT_OK
            } else {
                OFFENSIVE_CONTENT
            };
            ctx.reply(text).with_debug(serde_json::json!({ "moderation": verdict.report() }))
        }
        Err(e) => {
            tracing::warn!(conv_id = %ctx.conversation_id, error = %e, "Safety check analysis failed");
            ctx.reply(ANALYSIS_FAILED)
                .with_debug(serde_json::Value::String(ANALYSIS_FAILED_DIAGNOSTIC.to_string()))
        }
    }
}
