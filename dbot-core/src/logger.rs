//! Tracing initialization: fmt layer (level, target, span, all fields) to stdout and optionally a log file.

use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;

use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Initializes the global tracing subscriber.
/// Level comes from `RUST_LOG` (e.g. info, debug, trace); defaults to info.
/// When `log_file_path` is set, the same output is appended to that file.
pub fn init_tracing(log_file_path: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    match log_file_path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let file = Arc::new(file);
            use tracing_subscriber::fmt::writer::MakeWriterExt;
            let writer = io::stdout.and(file);
            Registry::default()
                .with(env_filter)
                .with(fmt_layer.with_writer(writer))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;
        }
        None => {
            Registry::default()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;
        }
    }

    Ok(())
}

/// Installs a test-writer subscriber (captured by the test harness). Safe to call from every test.
pub fn init_test_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}
