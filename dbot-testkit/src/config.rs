use dbot_core::{DbotError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_RESPONSES_DIR: &str = "resources";
pub const DEFAULT_CHANNEL_ID: &str = "test";

/// Test harness configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestConfig {
    /// How long a reply assertion waits. `DBOT_TEST_TIMEOUT_MS`.
    pub timeout: Duration,
    /// Directory holding template sets. `DBOT_RESPONSES_DIR`.
    pub responses_dir: PathBuf,
    /// Locale used when loading template sets. `DBOT_LOCALE`.
    pub locale: Option<String>,
    /// Optional log file in addition to test output. `DBOT_LOG_FILE`.
    pub log_file: Option<String>,
    /// Channel id stamped on every simulated activity. `DBOT_CHANNEL_ID`.
    pub channel_id: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            responses_dir: PathBuf::from(DEFAULT_RESPONSES_DIR),
            locale: None,
            log_file: None,
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
        }
    }
}

impl TestConfig {
    /// Loads `.env` (if present), then reads the environment.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Reads the environment only; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let timeout_ms = match env::var("DBOT_TEST_TIMEOUT_MS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                DbotError::Config(format!("DBOT_TEST_TIMEOUT_MS is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_MS,
        };
        let responses_dir = env::var("DBOT_RESPONSES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_RESPONSES_DIR));
        let locale = env::var("DBOT_LOCALE").ok().filter(|s| !s.is_empty());
        let log_file = env::var("DBOT_LOG_FILE").ok().filter(|s| !s.is_empty());
        let channel_id =
            env::var("DBOT_CHANNEL_ID").unwrap_or_else(|_| DEFAULT_CHANNEL_ID.to_string());

        let config = Self {
            timeout: Duration::from_millis(timeout_ms),
            responses_dir,
            locale,
            log_file,
            channel_id,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(DbotError::Config(
                "DBOT_TEST_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }
        if self.channel_id.trim().is_empty() {
            return Err(DbotError::Config("DBOT_CHANNEL_ID must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    pub fn with_responses_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.responses_dir = dir.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}
