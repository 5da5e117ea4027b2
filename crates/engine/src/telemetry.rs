use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::EngineError;

/// Installs the global fmt subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &LoggingConfig) -> Result<(), EngineError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| EngineError::Telemetry(e.to_string()))?;

    tracing::info!(level = %config.level, "logging initialized");
    Ok(())
}

/// Test variant: output goes through the test harness capture, and a second
/// call is a no-op.
pub fn init_for_tests() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("todocal=debug,warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}
