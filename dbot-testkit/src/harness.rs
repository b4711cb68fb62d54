//! Per-fixture entry point: builds flows around a bot-under-test and resolves expected replies.

use std::collections::HashMap;
use std::sync::Arc;

use dbot_core::{Bot, Middleware, Result};
use handler_chain::HandlerChain;
use middleware::{
    AutoSaveStateMiddleware, ConsoleOutputMiddleware, FakeIntentRecognizerMiddleware,
    ReplyCaptureMiddleware,
};
use responses::{resolve_replies_positional, Reply, ResponseBuilder, TemplateSet, TemplateStore};
use storage::{BotState, MemoryStorage, StateStore};
use tracing::{debug, warn};

use crate::adapter::TestAdapter;
use crate::config::TestConfig;
use crate::flow::TestFlow;

/// Builds the bot-under-test. Called once per simulated turn.
pub trait BotFactory: Send + Sync {
    fn build_bot(&self) -> Arc<dyn Bot>;
}

impl<F> BotFactory for F
where
    F: Fn() -> Arc<dyn Bot> + Send + Sync,
{
    fn build_bot(&self) -> Arc<dyn Bot> {
        self()
    }
}

pub struct BotTestHarness {
    factory: Arc<dyn BotFactory>,
    config: TestConfig,
    response_builder: ResponseBuilder,
    templates: TemplateStore,
}

impl BotTestHarness {
    /// Harness with default config.
    pub fn new(factory: impl BotFactory + 'static) -> Self {
        Self::with_config(factory, TestConfig::default())
    }

    pub fn with_config(factory: impl BotFactory + 'static, config: TestConfig) -> Self {
        let templates = TemplateStore::new(config.responses_dir.clone());
        Self {
            factory: Arc::new(factory),
            config,
            response_builder: ResponseBuilder::default(),
            templates,
        }
    }

    /// Loads config from the environment and installs test tracing.
    pub fn initialize(factory: impl BotFactory + 'static) -> Result<Self> {
        let config = TestConfig::load()?;
        match config.log_file.as_deref() {
            Some(path) => {
                if let Err(e) = dbot_core::init_tracing(Some(path)) {
                    warn!(error = %e, "Tracing already initialized; log file not attached");
                }
            }
            None => dbot_core::init_test_tracing(),
        }
        Ok(Self::with_config(factory, config))
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn response_builder(&self) -> &ResponseBuilder {
        &self.response_builder
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Template set `id` for the configured locale.
    pub fn load_templates(&self, id: &str) -> Result<Arc<TemplateSet>> {
        self.templates.load_localized(id, self.config.locale.as_deref())
    }

    /// Flow with a fake recognizer (default confirm/cancel intents added first), or an
    /// event-only flow for `None`.
    pub fn test_flow(&self, recognizer: Option<Arc<FakeIntentRecognizerMiddleware>>) -> TestFlow {
        match recognizer {
            Some(recognizer) => {
                recognizer.add_default_intents();
                self.build_flow(Some(recognizer as Arc<dyn Middleware>))
            }
            None => self.build_flow(None),
        }
    }

    /// Flow with any recognizer middleware; no default intents are added.
    pub fn test_flow_with_middleware(&self, recognizer: Arc<dyn Middleware>) -> TestFlow {
        self.build_flow(Some(recognizer))
    }

    /// Flow whose fake recognizer resolves `target_intent` for every unmapped utterance.
    pub fn test_flow_with_intent(&self, target_intent: Option<&str>) -> TestFlow {
        let recognizer = FakeIntentRecognizerMiddleware::new(target_intent.map(str::to_string));
        self.test_flow(Some(Arc::new(recognizer)))
    }

    /// Flow without any recognizer: turns reach the bot unannotated.
    pub fn test_event_flow(&self) -> TestFlow {
        self.build_flow(None)
    }

    fn build_flow(&self, recognizer: Option<Arc<dyn Middleware>>) -> TestFlow {
        let memory = MemoryStorage::new();
        let store: Arc<dyn StateStore> = Arc::new(memory.clone());
        let (capture, replies) = ReplyCaptureMiddleware::with_receiver();

        let mut chain = HandlerChain::new()
            .add_middleware(Arc::new(AutoSaveStateMiddleware::new(
                BotState::user(store.clone()),
                BotState::conversation(store),
            )))
            .add_middleware(Arc::new(ConsoleOutputMiddleware))
            .add_middleware(Arc::new(capture));
        let with_recognizer = recognizer.is_some();
        if let Some(recognizer) = recognizer {
            chain.push(recognizer);
        }
        debug!(
            middleware = chain.len(),
            with_recognizer,
            "step: test flow assembled"
        );

        let adapter = TestAdapter::new(chain).with_channel_id(self.config.channel_id.clone());
        TestFlow::new(Arc::new(adapter), self.factory.clone(), replies)
            .with_storage(memory)
            .with_timeout_duration(self.config.timeout)
    }

    /// Reply texts formatted with named tokens; `None` yields one empty string per reply.
    pub fn resolve_replies(
        &self,
        replies: &[Reply],
        tokens: Option<&HashMap<String, String>>,
    ) -> Result<Vec<String>> {
        self.response_builder.resolve_replies(replies, tokens)
    }

    /// Reply `i` formatted with `tokens[i]` in every placeholder.
    pub fn resolve_replies_positional<S: AsRef<str>>(
        &self,
        replies: &[Reply],
        tokens: &[S],
    ) -> Result<Vec<String>> {
        resolve_replies_positional(replies, tokens)
    }

    /// Speech renderings formatted with named tokens; `None` yields one empty string per reply.
    pub fn resolve_speak_replies(
        &self,
        replies: &[Reply],
        tokens: Option<&HashMap<String, String>>,
    ) -> Result<Vec<String>> {
        self.response_builder.resolve_speak_replies(replies, tokens)
    }
}
