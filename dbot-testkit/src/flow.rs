//! Scripted conversation: an ordered list of sends and reply assertions.
//!
//! Steps are registered with builder calls and executed strictly in order by
//! [`TestFlow::start_test`]. Each send runs its turn on a spawned task; replies reach the flow
//! through the reply-capture channel as the bot sends them. An assertion waits until the reply
//! it needs is available, the turn finishes without it, or the timeout fires. A new send first
//! waits for the previous turn to finish.

use std::sync::Arc;
use std::time::Duration;

use dbot_core::{Activity, DbotError, Result};
use responses::ExpectedReply;
use serde_json::Value;
use storage::MemoryStorage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapter::TestAdapter;
use crate::harness::BotFactory;

type ActivityCheck = Box<dyn Fn(&Activity) -> bool + Send + Sync>;

enum ReplyCheck {
    Text(ExpectedReply),
    OneOf(Vec<String>),
    Predicate {
        description: String,
        check: ActivityCheck,
    },
}

enum Step {
    Send(Activity),
    Assert {
        check: ReplyCheck,
        timeout: Option<Duration>,
    },
    AssertExact {
        expected: Vec<ExpectedReply>,
        timeout: Option<Duration>,
    },
    AssertNoReply,
    Delay(Duration),
}

pub struct TestFlow {
    adapter: Arc<TestAdapter>,
    factory: Arc<dyn BotFactory>,
    replies: mpsc::UnboundedReceiver<Activity>,
    storage: Option<MemoryStorage>,
    timeout: Duration,
    steps: Vec<Step>,
}

impl TestFlow {
    /// Flow over `adapter`; `replies` must be the receiver of the adapter's reply-capture middleware.
    pub fn new(
        adapter: Arc<TestAdapter>,
        factory: Arc<dyn BotFactory>,
        replies: mpsc::UnboundedReceiver<Activity>,
    ) -> Self {
        Self {
            adapter,
            factory,
            replies,
            storage: None,
            timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
            steps: Vec::new(),
        }
    }

    pub(crate) fn with_storage(mut self, storage: MemoryStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// State store behind this flow's auto-save middleware, when built by the harness.
    pub fn storage(&self) -> Option<&MemoryStorage> {
        self.storage.as_ref()
    }

    pub fn adapter(&self) -> &TestAdapter {
        &self.adapter
    }

    /// Default wait for every later assertion without its own timeout.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    pub(crate) fn with_timeout_duration(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// User says `text`.
    pub fn send(self, text: impl Into<String>) -> Self {
        self.send_activity(Activity::message(text))
    }

    pub fn send_activity(mut self, activity: Activity) -> Self {
        self.steps.push(Step::Send(activity));
        self
    }

    pub fn send_event(self, name: impl Into<String>, value: Option<Value>) -> Self {
        self.send_activity(Activity::event(name, value))
    }

    pub fn send_conversation_update(self) -> Self {
        self.send_activity(Activity::conversation_update())
    }

    /// Next reply's text must equal `expected` (tokens are resolved first).
    pub fn assert_reply(self, expected: impl Into<ExpectedReply>) -> Self {
        self.push_assert(ReplyCheck::Text(expected.into()), None)
    }

    /// [`TestFlow::assert_reply`] with its own timeout.
    pub fn assert_reply_timeout(self, expected: impl Into<ExpectedReply>, timeout_ms: u64) -> Self {
        self.push_assert(
            ReplyCheck::Text(expected.into()),
            Some(Duration::from_millis(timeout_ms)),
        )
    }

    /// The turn's replies must be exactly `expected`, in order: no reordering, extras or gaps.
    pub fn assert_replies<I, E>(mut self, expected: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<ExpectedReply>,
    {
        self.steps.push(Step::AssertExact {
            expected: expected.into_iter().map(Into::into).collect(),
            timeout: None,
        });
        self
    }

    /// Next reply's text must equal one of `candidates`.
    pub fn assert_reply_one_of<I, S>(self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_assert(
            ReplyCheck::OneOf(candidates.into_iter().map(Into::into).collect()),
            None,
        )
    }

    /// Next reply's text must satisfy `check`; `description` is reported on failure.
    pub fn assert_reply_with<F>(self, description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.assert_reply_activity(description, move |activity: &Activity| {
            check(activity.text_or_empty())
        })
    }

    /// Next reply activity must satisfy `check`.
    pub fn assert_reply_activity<F>(self, description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Activity) -> bool + Send + Sync + 'static,
    {
        self.push_assert(
            ReplyCheck::Predicate {
                description: description.into(),
                check: Box::new(check),
            },
            None,
        )
    }

    /// The current turn must finish without any further reply.
    pub fn assert_no_reply(mut self) -> Self {
        self.steps.push(Step::AssertNoReply);
        self
    }

    pub fn delay(mut self, ms: u64) -> Self {
        self.steps.push(Step::Delay(Duration::from_millis(ms)));
        self
    }

    fn push_assert(mut self, check: ReplyCheck, timeout: Option<Duration>) -> Self {
        self.steps.push(Step::Assert { check, timeout });
        self
    }

    /// Runs every step in order. The first failing step ends the flow with its error.
    pub async fn start_test(self) -> Result<()> {
        let TestFlow {
            adapter,
            factory,
            replies,
            timeout,
            steps,
            ..
        } = self;
        let mut runner = FlowRunner {
            adapter,
            factory,
            replies,
            pending: None,
            turn_replies: Vec::new(),
            turn: 0,
        };

        info!(steps = steps.len(), "step: test flow started");
        for step in steps {
            match step {
                Step::Send(activity) => runner.send(activity, timeout).await?,
                Step::Assert {
                    check,
                    timeout: step_timeout,
                } => runner.assert_one(check, step_timeout.unwrap_or(timeout)).await?,
                Step::AssertExact {
                    expected,
                    timeout: step_timeout,
                } => {
                    runner
                        .assert_exact(&expected, step_timeout.unwrap_or(timeout))
                        .await?
                }
                Step::AssertNoReply => runner.assert_no_reply(timeout).await?,
                Step::Delay(duration) => tokio::time::sleep(duration).await,
            }
        }
        runner.finish_turn(timeout, &[]).await?;
        info!(turns = runner.turn, "step: test flow finished");
        Ok(())
    }
}

enum NextReply {
    Reply(Activity),
    TurnDone,
    TimedOut,
}

enum Wake {
    Reply(Option<Activity>),
    Joined(std::result::Result<Result<()>, tokio::task::JoinError>),
    Elapsed,
}

struct FlowRunner {
    adapter: Arc<TestAdapter>,
    factory: Arc<dyn BotFactory>,
    replies: mpsc::UnboundedReceiver<Activity>,
    pending: Option<JoinHandle<Result<()>>>,
    /// Reply texts taken from the current turn so far.
    turn_replies: Vec<String>,
    turn: usize,
}

fn turn_result(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(|e| DbotError::Bot(format!("turn task failed: {}", e)))?
}

fn reply_text(activity: &Activity) -> String {
    activity.text_or_empty().to_string()
}

impl FlowRunner {
    async fn send(&mut self, activity: Activity, timeout: Duration) -> Result<()> {
        self.finish_turn(timeout, &[]).await?;
        while let Ok(leftover) = self.replies.try_recv() {
            warn!(
                turn = self.turn,
                text = %leftover.text_or_empty(),
                "Unasserted reply discarded"
            );
        }
        self.turn_replies.clear();
        self.turn += 1;

        debug!(turn = self.turn, text = %activity.text_or_empty(), "step: send");
        let adapter = self.adapter.clone();
        let factory = self.factory.clone();
        self.pending = Some(tokio::spawn(async move {
            let bot = factory.build_bot();
            adapter.process_activity(activity, bot.as_ref()).await?;
            Ok(())
        }));
        Ok(())
    }

    /// Waits for the current turn to finish; a bot error or timeout fails the flow.
    async fn finish_turn(&mut self, timeout: Duration, expected: &[String]) -> Result<()> {
        let Some(handle) = self.pending.take() else {
            return Ok(());
        };
        let abort = handle.abort_handle();
        match tokio::time::timeout(timeout, handle).await {
            Ok(joined) => turn_result(joined),
            Err(_) => {
                abort.abort();
                warn!(turn = self.turn, "Turn still running at timeout; aborted");
                Err(DbotError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                    expected: expected.to_vec(),
                    partial: self.turn_replies.clone(),
                })
            }
        }
    }

    /// Cancels the running turn, if any. The flow has already failed.
    fn abort_turn(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
            warn!(turn = self.turn, "Turn still running at timeout; aborted");
        }
    }

    async fn next_reply(&mut self, timeout: Duration) -> Result<NextReply> {
        if let Ok(reply) = self.replies.try_recv() {
            return Ok(NextReply::Reply(reply));
        }
        let Some(handle) = self.pending.as_mut() else {
            return Ok(NextReply::TurnDone);
        };

        let wake = tokio::select! {
            reply = self.replies.recv() => Wake::Reply(reply),
            joined = handle => Wake::Joined(joined),
            _ = tokio::time::sleep(timeout) => Wake::Elapsed,
        };

        match wake {
            Wake::Reply(Some(reply)) => Ok(NextReply::Reply(reply)),
            Wake::Reply(None) => Ok(NextReply::TurnDone),
            Wake::Joined(joined) => {
                self.pending = None;
                turn_result(joined)?;
                Ok(match self.replies.try_recv() {
                    Ok(reply) => NextReply::Reply(reply),
                    Err(_) => NextReply::TurnDone,
                })
            }
            Wake::Elapsed => Ok(NextReply::TimedOut),
        }
    }

    async fn assert_one(&mut self, check: ReplyCheck, timeout: Duration) -> Result<()> {
        let expected = match &check {
            ReplyCheck::Text(expected) => vec![expected.resolve()?],
            ReplyCheck::OneOf(candidates) => candidates.clone(),
            ReplyCheck::Predicate { description, .. } => vec![description.clone()],
        };

        let reply = match self.next_reply(timeout).await? {
            NextReply::Reply(reply) => reply,
            NextReply::TurnDone => {
                return Err(DbotError::ReplyMismatch {
                    expected,
                    actual: Vec::new(),
                })
            }
            NextReply::TimedOut => {
                self.abort_turn();
                return Err(DbotError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                    expected,
                    partial: self.turn_replies.clone(),
                });
            }
        };

        let text = reply_text(&reply);
        self.turn_replies.push(text.clone());
        let matched = match &check {
            ReplyCheck::Text(_) | ReplyCheck::OneOf(_) => expected.iter().any(|e| *e == text),
            ReplyCheck::Predicate { check, .. } => check(&reply),
        };
        debug!(turn = self.turn, text = %text, matched, "step: assert reply");
        if matched {
            Ok(())
        } else {
            Err(DbotError::ReplyMismatch {
                expected,
                actual: vec![text],
            })
        }
    }

    async fn assert_exact(&mut self, expected: &[ExpectedReply], timeout: Duration) -> Result<()> {
        let expected = expected
            .iter()
            .map(ExpectedReply::resolve)
            .collect::<Result<Vec<String>>>()?;

        let mut actual = Vec::with_capacity(expected.len());
        while actual.len() < expected.len() {
            match self.next_reply(timeout).await? {
                NextReply::Reply(reply) => {
                    let text = reply_text(&reply);
                    self.turn_replies.push(text.clone());
                    actual.push(text);
                }
                NextReply::TurnDone => break,
                NextReply::TimedOut => {
                    self.abort_turn();
                    return Err(DbotError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                        expected,
                        partial: self.turn_replies.clone(),
                    });
                }
            }
        }

        // Anything the bot sends after the expected count is an extra reply.
        self.finish_turn(timeout, &expected).await?;
        while let Ok(reply) = self.replies.try_recv() {
            let text = reply_text(&reply);
            self.turn_replies.push(text.clone());
            actual.push(text);
        }

        debug!(turn = self.turn, expected = ?expected, actual = ?actual, "step: assert replies");
        if actual == expected {
            Ok(())
        } else {
            Err(DbotError::ReplyMismatch { expected, actual })
        }
    }

    async fn assert_no_reply(&mut self, timeout: Duration) -> Result<()> {
        self.finish_turn(timeout, &[]).await?;
        let extra: Vec<String> = std::iter::from_fn(|| self.replies.try_recv().ok())
            .map(|reply| reply_text(&reply))
            .collect();
        if extra.is_empty() {
            Ok(())
        } else {
            self.turn_replies.extend(extra.iter().cloned());
            Err(DbotError::ReplyMismatch {
                expected: Vec::new(),
                actual: extra,
            })
        }
    }
}
