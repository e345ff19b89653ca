//! Agent configuration

use super::Behavior;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AGENT_ID: &str = "workbench-agent";

/// Agent behavior settings. Dispatch calls work on an immutable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_behavior")]
    pub behavior: Behavior,
    #[serde(default)]
    pub commands_enabled: bool,
    #[serde(default)]
    pub reply_to_agents: bool,
}

fn default_behavior() -> Behavior {
    Behavior::Echo
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            behavior: default_behavior(),
            commands_enabled: false,
            reply_to_agents: false,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            behavior: lookup("AGENT_BEHAVIOR").map_or(defaults.behavior, |b| Behavior::resolve(&b)),
            commands_enabled: lookup("AGENT_COMMANDS_ENABLED")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.commands_enabled),
            reply_to_agents: lookup("AGENT_REPLY_TO_AGENTS")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.reply_to_agents),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_commands_enabled(mut self, enabled: bool) -> Self {
        self.commands_enabled = enabled;
        self
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_reply_to_agents(mut self, enabled: bool) -> Self {
        self.reply_to_agents = enabled;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
