use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr, or to a daily rolling file when `log_directory` is set.
/// stdout is left to the event feed either way.
///
/// The returned guard must be held until exit so buffered file output is
/// flushed.
pub fn init_logging(
    log_directory: Option<&Path>,
    default_level: &str,
) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter_str = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    let env_filter = EnvFilter::try_new(&env_filter_str).map_err(|e| {
        anyhow::anyhow!("Failed to parse log filter '{}': {}", env_filter_str, e)
    })?;

    let guard = match log_directory {
        Some(log_directory) => {
            let file_appender = tracing_appender::rolling::daily(log_directory, "procsnoop.log");
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking_writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;
            tracing::info!(
                "Logging system initialized. Log directory: {}",
                log_directory.display()
            );
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;
            None
        }
    };

    tracing::debug!("Log level configured as '{}'", env_filter_str);
    Ok(guard)
}
