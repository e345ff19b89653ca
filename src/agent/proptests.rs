//! Property-based tests for the dispatcher
//!
//! These tests check dispatcher invariants across generated inputs.

use super::behavior::{reverse_text, Behavior, ReplyContext};
use super::config::AgentConfig;
use super::dispatcher::{Command, DispatchOutcome, SkipReason};
use super::testing::*;
use crate::db::{NewMessage, Role, Sender};
use crate::moderation::{ModerationError, ModerationGate};
use proptest::prelude::*;
use std::future::Future;
use tokio_util::sync::CancellationToken;

const CONV: &str = "prop-conv";

// ============================================================================
// Test Helpers
// ============================================================================

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    None,
    StorageInbound,
    StorageOutbound,
    Delivery,
    Moderation,
}

fn dispatcher_with(config: AgentConfig, failure: Failure) -> TestDispatcher {
    let history = match failure {
        Failure::StorageInbound => InMemoryHistory::failing(),
        Failure::StorageOutbound => InMemoryHistory::failing_after(1),
        _ => InMemoryHistory::new(),
    };
    let transport = match failure {
        Failure::Delivery => RecordingTransport::failing(),
        _ => RecordingTransport::new(),
    };
    let moderation = MockModerationProvider::new();
    if matches!(failure, Failure::Moderation) {
        moderation.queue_error(ModerationError::server_error("injected"));
        moderation.queue_error(ModerationError::server_error("injected"));
    }
    TestDispatcher::with_parts(config, history, transport, moderation)
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_behavior() -> impl Strategy<Value = Behavior> {
    prop::sample::select(Behavior::all().collect::<Vec<_>>())
}

fn arb_failure() -> impl Strategy<Value = Failure> {
    prop_oneof![
        Just(Failure::None),
        Just(Failure::StorageInbound),
        Just(Failure::StorageOutbound),
        Just(Failure::Delivery),
        Just(Failure::Moderation),
    ]
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::User),
        Just(Role::Assistant),
        Just(Role::System),
        Just(Role::Unknown),
    ]
}

fn arb_config() -> impl Strategy<Value = AgentConfig> {
    (arb_behavior(), any::<bool>(), any::<bool>()).prop_map(|(behavior, commands, agents)| {
        AgentConfig::default()
            .with_behavior(behavior)
            .with_commands_enabled(commands)
            .with_reply_to_agents(agents)
    })
}

fn arb_message() -> impl Strategy<Value = NewMessage> {
    ("[a-z-]{1,12}", arb_role(), "[ a-zA-Z0-9!?]{0,40}")
        .prop_map(|(id, role, text)| NewMessage::new(Sender::new(id, role), text))
}

fn arb_command() -> impl Strategy<Value = Command> {
    (
        prop_oneof![Just("say".to_string()), Just("SAY".to_string()), "[a-z]{1,8}"],
        "[ a-z]{0,20}",
        arb_role(),
    )
        .prop_map(|(name, params, role)| Command::new(name, params, Sender::new("sender", role)))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Reversing twice gives back the original text
    #[test]
    fn prop_reverse_round_trips(text in any::<String>()) {
        prop_assert_eq!(reverse_text(&reverse_text(&text)), text.clone());
        prop_assert_eq!(reverse_text(&text).chars().count(), text.chars().count());
    }

    /// Whatever happens inside a message dispatch, the status ends cleared
    #[test]
    fn prop_message_status_always_cleared(
        config in arb_config(),
        failure in arb_failure(),
        message in arb_message(),
    ) {
        let t = dispatcher_with(config, failure);
        let _ = block_on(t.dispatcher.handle_message(CONV, message, &CancellationToken::new()));

        prop_assert_eq!(t.status(CONV), None);
        if let Some(last) = t.sink.events().last() {
            prop_assert_eq!(last, &(CONV.to_string(), None));
        }
    }

    /// Same for commands, including the early guards
    #[test]
    fn prop_command_status_always_cleared(
        config in arb_config(),
        failure in arb_failure(),
        command in arb_command(),
    ) {
        let t = dispatcher_with(config, failure);
        let _ = block_on(t.dispatcher.handle_command(CONV, command, &CancellationToken::new()));

        prop_assert_eq!(t.status(CONV), None);
        prop_assert!(t.sink.events().len() % 2 == 0);
    }

    /// Storage and delivery failures always reach the caller
    #[test]
    fn prop_failures_propagate(behavior in arb_behavior(), text in "[a-z]{1,20}") {
        for failure in [Failure::StorageInbound, Failure::Delivery] {
            let t = dispatcher_with(AgentConfig::default().with_behavior(behavior), failure);
            let result = block_on(t.dispatcher.handle_message(
                CONV,
                NewMessage::new(Sender::user("user"), text.clone()),
                &CancellationToken::new(),
            ));

            match failure {
                // Every behavior records the inbound message first
                Failure::StorageInbound => prop_assert!(result.is_err()),
                // Only replying behaviors reach the transport
                _ => prop_assert_eq!(result.is_err(), behavior != Behavior::None),
            }
        }
    }

    /// Disabled commands never touch history or transport
    #[test]
    fn prop_disabled_commands_are_inert(behavior in arb_behavior(), command in arb_command()) {
        let t = TestDispatcher::new(AgentConfig::default().with_behavior(behavior));
        let outcome = block_on(t.dispatcher.handle_command(CONV, command, &CancellationToken::new()))
            .unwrap();

        prop_assert_eq!(
            outcome,
            DispatchOutcome::Skipped { reason: SkipReason::CommandsDisabled, inbound: None }
        );
        prop_assert_eq!(t.history.append_attempts(), 0);
        prop_assert!(t.transport.sent_messages().is_empty());
    }

    /// With reply-to-agents off, agent messages are recorded and never answered
    #[test]
    fn prop_agent_messages_never_answered(behavior in arb_behavior(), text in "[ a-z]{0,20}") {
        let t = TestDispatcher::new(AgentConfig::default().with_behavior(behavior));
        let outcome = block_on(t.dispatcher.handle_message(
            CONV,
            NewMessage::new(Sender::assistant("other-agent"), text),
            &CancellationToken::new(),
        ))
        .unwrap();

        let is_agent_skip = matches!(
            outcome,
            DispatchOutcome::Skipped { reason: SkipReason::AgentSender, inbound: Some(_) }
        );
        prop_assert!(is_agent_skip);
        prop_assert_eq!(t.history.append_attempts(), 1);
        prop_assert!(t.transport.sent_messages().is_empty());
        prop_assert!(t.moderation.recorded_inputs().is_empty());
    }

    /// Sample behaviors ignore their input and answer the same every time
    #[test]
    fn prop_samples_are_constant(
        behavior in arb_behavior().prop_filter("fixed-output behaviors", |b| {
            !matches!(b, Behavior::Echo | Behavior::Reverse | Behavior::SafetyCheck)
        }),
        first in "[ a-zA-Z]{0,30}",
        second in "[ a-zA-Z]{0,30}",
    ) {
        let gate = ModerationGate::new(MockModerationProvider::new());
        let ctx = ReplyContext { conversation_id: CONV, agent_id: TEST_AGENT_ID, gate: &gate };

        let a = block_on(behavior.respond(&ctx, &NewMessage::new(Sender::user("u"), first)));
        let b = block_on(behavior.respond(&ctx, &NewMessage::new(Sender::user("u"), second)));

        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.is_none(), behavior == Behavior::None);
        prop_assert!(gate.provider().recorded_inputs().is_empty());
    }
}
