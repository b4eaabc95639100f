//! Tracing subscriber setup for binaries and tests

use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Include file and line in each event
    pub include_location: bool,
    /// Emit span open/close events for adapter calls
    pub enable_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            include_location: cfg!(debug_assertions),
            enable_spans: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: &str) -> Self {
        Self {
            default_filter: format!("warn,qcert_core={0},qcert_memory={0},qcert_harness={0},qcert={0}", level),
            ..Self::default()
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))?;

    // NEW/CLOSE only; ENTER would repeat on every poll of an instrumented future
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(span_events)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    tracing::debug!(filter = %config.default_filter, "logging initialized");
    Ok(())
}

/// Route harness logs to the test writer. Safe to call from every test.
pub fn init_for_tests() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("qcert_harness=debug,qcert_memory=debug"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
