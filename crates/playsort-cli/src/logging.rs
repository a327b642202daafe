use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use playsort_core::config::{AppConfig, LoggingConfig};

const DEFAULT_FILTER: &str = "playsort=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// The returned guard flushes the log file on drop and must outlive the run.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, guard) = if config.file {
        let appender = tracing_appender::rolling::daily(AppConfig::log_dir(), "playsort.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}
