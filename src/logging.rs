use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directive string for the default filter.
///
/// RELAY is the change-feed hot path target; it fires on every table
/// mutation, so it stays off unless tracing is explicitly enabled.
fn default_directives(level: &str, enable_tracing: bool) -> String {
    if enable_tracing {
        level.to_string()
    } else {
        format!("{level},RELAY=off")
    }
}

fn file_appender(config: &AppConfig) -> RollingFileAppender {
    match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        "never" => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
        other => {
            eprintln!("Unknown log rotation '{other}', falling back to daily");
            tracing_appender::rolling::daily(&config.log_dir, &config.log_file)
        }
    }
}

/// Install the global subscriber. The returned guard must stay alive
/// for the whole process or buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(config));

    // RUST_LOG wins over the config file when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directives(&config.log_level, config.enable_tracing))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        // machine-readable file output only; targets kept for queries
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(file_writer)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(file_writer)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}
