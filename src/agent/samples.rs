//! Fixed sample payloads returned by the sample behaviors

pub const MARKDOWN_SAMPLE: &str = r#"# Testing agents in the workbench

This agent shows how each **content type** is rendered by the workbench.

## What it does

Pick a behavior in the agent configuration and send any message:

- `echo` repeats what you wrote, after a content safety check.
- `reverse` writes your message backwards, checking both the input and the output.
- `safety check` reports the per-category analysis of your message.

Samples such as this one ignore the message text and always return the same payload."#;

pub const HTML_SAMPLE: &str = r#"<h1>Testing agents in the workbench</h1>

<p>This agent shows how each <b>content type</b> is rendered by the workbench.</p>

<h2>What it does</h2>

<ul>
  <li><code>echo</code> repeats what you wrote, after a content safety check.</li>
  <li><code>reverse</code> writes your message backwards, checking both the input and the output.</li>
  <li><code>safety check</code> reports the per-category analysis of your message.</li>
</ul>

<p>Samples such as this one ignore the message text and always return the same payload.</p>"#;

pub const CODE_SAMPLE: &str = r#"How to wire the dispatcher to a database and a channel hub:

```rust
let hub = Arc::new(ChannelHub::new());
let dispatcher = Dispatcher::new(
    "sample-agent",
    AgentConfig::default(),
    DatabaseHistory::new(Database::open_in_memory()?),
    hub.clone(),
    ModerationGate::new(provider),
    Arc::new(StatusBoard::new(hub)),
);
let outcome = dispatcher
    .handle_message("conv-1", message, &CancellationToken::new())
    .await?;
```"#;

pub const MERMAID_SAMPLE: &str = r#"```mermaid
sequenceDiagram
    participant T as Transport
    participant D as Dispatcher
    participant H as History
    participant M as Moderation
    T->>D: message
    D->>D: status "Thinking..."
    D->>H: append inbound
    D->>M: analyze
    M-->>D: verdict
    D->>H: append outbound
    D->>T: deliver
    D->>D: clear status
```"#;

pub const MUSIC_SAMPLE: &str = r"```abc
X:1
T:Frere Jacques
M:4/4
L:1/4
K:F
F G A F | F G A F | A B c2 | A B c2 |
c/d/c/B/ A F | c/d/c/B/ A F | F C F2 | F C F2 |
```";

pub const JSON_SAMPLE: &str = r#"{
  "agent": "workbench-agent",
  "behaviors": [
    "echo",
    "reverse",
    "safety check"
  ],
  "settings": {
    "commands_enabled": true,
    "reply_to_agents": false
  },
  "version": 1
}"#;
