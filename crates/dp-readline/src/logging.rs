use anyhow::Result;
use dp_infrastructure::DpPaths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn,dp_application=info,dp_infrastructure=info,dp_readline=info";

/// Initializes file logging under the platform log directory.
///
/// Output goes to a daily-rolling `dp-agent.log` so it does not interleave
/// with the prompt. `RUST_LOG` overrides the default filter. The returned
/// guard flushes pending lines when dropped and must be held until exit.
pub fn init() -> Result<WorkerGuard> {
    let log_dir = DpPaths::log_dir()?;
    DpPaths::ensure_dir(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "dp-agent.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::builder().parse(DEFAULT_FILTER))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()?;

    tracing::info!("Logging to {}", log_dir.display());
    Ok(guard)
}
