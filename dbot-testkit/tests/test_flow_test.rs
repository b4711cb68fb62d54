mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dbot_core::{Activity, Bot, DbotError, HandlerError, InputHint, Result, TurnContext};
use dbot_testkit::{BotTestHarness, ExpectedReply, FakeIntentRecognizerMiddleware, Tokens};
use serde_json::json;

use common::*;

/// Sends one reply, then stalls well past any test timeout before the second.
struct StallingBot;

#[async_trait]
impl Bot for StallingBot {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<()> {
        ctx.send_text("first");
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        ctx.send_text("second");
        Ok(())
    }
}

/// Marks `finished` only if its turn runs to completion.
struct FinishingBot {
    finished: Arc<AtomicBool>,
}

#[async_trait]
impl Bot for FinishingBot {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.finished.store(true, Ordering::SeqCst);
        ctx.send_text("late");
        Ok(())
    }
}

fn finishing_harness(finished: Arc<AtomicBool>) -> BotTestHarness {
    BotTestHarness::new(move || -> Arc<dyn Bot> {
        Arc::new(FinishingBot {
            finished: finished.clone(),
        })
    })
}

fn message_harness() -> BotTestHarness {
    let templates = message_templates();
    BotTestHarness::new(move || -> Arc<dyn Bot> {
        Arc::new(MessageBot {
            templates: templates.clone(),
        })
    })
}

#[tokio::test]
async fn test_target_intent_resolves_unmapped_utterances() {
    dbot_core::init_test_tracing();
    let harness = harness_for(|| IntentEchoBot);

    harness
        .test_flow_with_intent(Some("Cancel"))
        .send("anything")
        .assert_reply("intent: Cancel")
        .send("something else entirely")
        .assert_reply("intent: Cancel")
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_default_intents_without_target() {
    let harness = harness_for(|| IntentEchoBot);

    harness
        .test_flow_with_intent(None)
        .send("Yes")
        .assert_reply("intent: ConfirmYes")
        .send("No")
        .assert_reply("intent: ConfirmNo")
        .send("Cancel")
        .assert_reply("intent: Cancel")
        .send("yes")
        .assert_reply("intent: None")
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_custom_mapping_overrides_default_intent() {
    let harness = harness_for(|| IntentEchoBot);
    let recognizer = Arc::new(FakeIntentRecognizerMiddleware::new(None));
    let flow = harness.test_flow(Some(recognizer.clone()));
    recognizer.add_intent_result("Yes", "Agree");
    recognizer.add_intent_result("send it", "SendMessage");

    flow.send("Yes")
        .assert_reply("intent: Agree")
        .send("send it")
        .assert_reply("intent: SendMessage")
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_event_flow_leaves_turns_unannotated() {
    let harness = harness_for(|| EventBot);

    harness
        .test_event_flow()
        .send_event("reminder", Some(json!({"at": "09:00"})))
        .assert_reply(r#"event: reminder {"at":"09:00"}"#)
        .send_conversation_update()
        .assert_reply("Welcome!")
        .send("Yes")
        .assert_reply("echo: Yes (None)")
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_recognizer_ignores_events() {
    let harness = harness_for(|| EventBot);

    harness
        .test_flow_with_intent(Some("Cancel"))
        .send_event("Yes", None)
        .assert_reply("event: Yes ")
        .send("Yes")
        .assert_reply("echo: Yes (ConfirmYes)")
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_assert_replies_in_order() {
    let harness = harness_for(|| ScriptedBot(vec!["A", "B"]));

    harness
        .test_event_flow()
        .send("go")
        .assert_replies(["A", "B"])
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_assert_replies_rejects_reordering() {
    let harness = harness_for(|| ScriptedBot(vec!["A", "B"]));

    let err = harness
        .test_event_flow()
        .send("go")
        .assert_replies(["B", "A"])
        .start_test()
        .await
        .unwrap_err();

    match err {
        DbotError::ReplyMismatch { expected, actual } => {
            assert_eq!(expected, vec!["B", "A"]);
            assert_eq!(actual, vec!["A", "B"]);
        }
        other => panic!("expected ReplyMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_assert_replies_rejects_extra_reply() {
    let harness = harness_for(|| ScriptedBot(vec!["A", "B"]));

    let err = harness
        .test_event_flow()
        .send("go")
        .assert_replies(["A"])
        .start_test()
        .await
        .unwrap_err();

    match err {
        DbotError::ReplyMismatch { actual, .. } => assert_eq!(actual, vec!["A", "B"]),
        other => panic!("expected ReplyMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_assert_replies_rejects_missing_reply() {
    let harness = harness_for(|| ScriptedBot(vec!["A", "B"]));

    let err = harness
        .test_event_flow()
        .send("go")
        .assert_replies(["A", "B", "C"])
        .start_test()
        .await
        .unwrap_err();

    match err {
        DbotError::ReplyMismatch { expected, actual } => {
            assert_eq!(expected.len(), 3);
            assert_eq!(actual, vec!["A", "B"]);
        }
        other => panic!("expected ReplyMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_assert_reply_mismatch_reports_actual_text() {
    let harness = harness_for(|| ScriptedBot(vec!["Hello"]));

    let err = harness
        .test_event_flow()
        .send("hi")
        .assert_reply("Goodbye")
        .start_test()
        .await
        .unwrap_err();

    match err {
        DbotError::ReplyMismatch { expected, actual } => {
            assert_eq!(expected, vec!["Goodbye"]);
            assert_eq!(actual, vec!["Hello"]);
        }
        other => panic!("expected ReplyMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_replies_arriving_asynchronously_are_awaited() {
    let harness = harness_for(|| SlowBot {
        delay: Duration::from_millis(30),
    });

    harness
        .test_event_flow()
        .send("hi")
        .assert_reply("first")
        .assert_reply("second")
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_timeout_reports_partial_replies() {
    let harness = harness_for(|| StallingBot);

    let err = harness
        .test_event_flow()
        .with_timeout(100)
        .send("hi")
        .assert_reply("first")
        .assert_reply("second")
        .start_test()
        .await
        .unwrap_err();

    match err {
        DbotError::Timeout {
            timeout_ms,
            expected,
            partial,
        } => {
            assert_eq!(timeout_ms, 100);
            assert_eq!(expected, vec!["second"]);
            assert_eq!(partial, vec!["first"]);
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_per_assertion_timeout_overrides_flow_default() {
    let harness = harness_for(|| SlowBot {
        delay: Duration::from_millis(150),
    });

    let err = harness
        .test_event_flow()
        .send("hi")
        .assert_reply_timeout("first", 50)
        .start_test()
        .await
        .unwrap_err();

    assert!(matches!(err, DbotError::Timeout { timeout_ms: 50, .. }));
}

#[tokio::test]
async fn test_silent_bot_fails_reply_assertion() {
    let harness = harness_for(|| SilentBot);

    let err = harness
        .test_event_flow()
        .send("hello?")
        .assert_reply("anything")
        .start_test()
        .await
        .unwrap_err();

    match err {
        DbotError::ReplyMismatch { actual, .. } => assert!(actual.is_empty()),
        other => panic!("expected ReplyMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_assert_no_reply() {
    harness_for(|| SilentBot)
        .test_event_flow()
        .send("hello?")
        .assert_no_reply()
        .start_test()
        .await
        .unwrap();

    let err = harness_for(|| ScriptedBot(vec!["unexpected"]))
        .test_event_flow()
        .send("hello?")
        .assert_no_reply()
        .start_test()
        .await
        .unwrap_err();
    assert!(matches!(err, DbotError::ReplyMismatch { .. }));
}

#[tokio::test]
async fn test_one_of_and_predicate_assertions() {
    let harness = harness_for(|| ScriptedBot(vec!["Hi there!", "How can I help?"]));

    harness
        .test_event_flow()
        .send("hello")
        .assert_reply_one_of(["Hello!", "Hi there!"])
        .assert_reply_with("asks a question", |text| text.ends_with('?'))
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_predicate_failure_reports_description() {
    let harness = harness_for(|| ScriptedBot(vec!["plain"]));

    let err = harness
        .test_event_flow()
        .send("hello")
        .assert_reply_with("mentions weather", |text| text.contains("weather"))
        .start_test()
        .await
        .unwrap_err();

    match err {
        DbotError::ReplyMismatch { expected, actual } => {
            assert_eq!(expected, vec!["mentions weather"]);
            assert_eq!(actual, vec!["plain"]);
        }
        other => panic!("expected ReplyMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bot_error_fails_flow() {
    let err = harness_for(|| FailingBot)
        .test_event_flow()
        .send("hi")
        .assert_reply("never")
        .start_test()
        .await
        .unwrap_err();

    assert!(matches!(err, DbotError::Bot(ref msg) if msg.contains("downstream unavailable")));
}

#[tokio::test]
async fn test_bot_error_fails_flow_without_assertions() {
    let err = harness_for(|| FailingBot)
        .test_event_flow()
        .send("hi")
        .start_test()
        .await
        .unwrap_err();

    assert!(matches!(err, DbotError::Bot(_)));
}

#[tokio::test]
async fn test_expected_reply_tokens_are_resolved() {
    let harness = message_harness();

    harness
        .test_flow_with_intent(None)
        .send("hi")
        .assert_reply("What message do you want to send?")
        .send("lunch at noon")
        .assert_reply(
            ExpectedReply::new("Send '{message}'?")
                .with_tokens(Tokens::named([("message", "lunch at noon")])),
        )
        .send("Yes")
        .assert_reply(
            ExpectedReply::new("Sent '{0}'.").with_tokens(Tokens::positional(["lunch at noon"])),
        )
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_conversation_state_persists_across_turns() {
    let harness = message_harness();
    let flow = harness.test_flow_with_intent(None);
    let storage = flow.storage().cloned().expect("harness flows own a store");
    let conversation_key = format!("test/conversations/{}", flow.adapter().conversation().id);

    flow.send("hi")
        .assert_reply("What message do you want to send?")
        .send("call mom")
        .assert_reply("Send 'call mom'?")
        .start_test()
        .await
        .unwrap();

    let keys = storage.keys().await;
    assert!(keys.contains(&conversation_key), "keys: {keys:?}");
    assert!(keys.contains(&"test/users/user1".to_string()), "keys: {keys:?}");
}

#[tokio::test]
async fn test_cancel_intent_resets_dialog() {
    let harness = message_harness();

    harness
        .test_flow_with_intent(None)
        .send("hi")
        .assert_reply("What message do you want to send?")
        .send("Cancel")
        .assert_reply("Ok, cancelled.")
        .send("hi again")
        .assert_reply("What message do you want to send?")
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_flows_do_not_share_state() {
    let harness = message_harness();

    harness
        .test_flow_with_intent(None)
        .send("hi")
        .assert_reply("What message do you want to send?")
        .start_test()
        .await
        .unwrap();

    // A second flow from the same harness starts from empty state.
    harness
        .test_flow_with_intent(None)
        .send("hi")
        .assert_reply("What message do you want to send?")
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reply_activity_carries_speak_and_input_hint() {
    let harness = message_harness();

    harness
        .test_flow_with_intent(None)
        .send("hi")
        .assert_reply_activity("expecting input with speech", |activity: &Activity| {
            activity.speak.as_deref() == Some("What message?")
                && activity.input_hint == Some(InputHint::ExpectingInput)
                && activity.from.id == "bot"
                && activity.recipient.id == "user1"
        })
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unasserted_replies_are_discarded_on_next_send() {
    let harness = harness_for(|| ScriptedBot(vec!["A", "B"]));

    harness
        .test_event_flow()
        .send("one")
        .assert_reply("A")
        .send("two")
        .assert_reply("A")
        .delay(10)
        .assert_reply("B")
        .start_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_message_bot_rejects_events() {
    let err = message_harness()
        .test_event_flow()
        .send_event("reminder", None)
        .assert_reply("What message do you want to send?")
        .start_test()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DbotError::Handler(HandlerError::UnexpectedActivity(ref kind)) if kind == "Event"
    ));
}

#[tokio::test]
async fn test_timed_out_turn_is_aborted() {
    let finished = Arc::new(AtomicBool::new(false));

    let err = finishing_harness(finished.clone())
        .test_event_flow()
        .with_timeout(50)
        .send("hi")
        .assert_reply("late")
        .start_test()
        .await
        .unwrap_err();
    assert!(matches!(err, DbotError::Timeout { .. }));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_turn_outliving_flow_timeout_is_aborted() {
    let finished = Arc::new(AtomicBool::new(false));

    let err = finishing_harness(finished.clone())
        .test_event_flow()
        .with_timeout(50)
        .send("hi")
        .start_test()
        .await
        .unwrap_err();
    assert!(matches!(err, DbotError::Timeout { .. }));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::SeqCst));
}
