use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::env;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// `$HOME/.podium/logs`, or `./logs` when there is no home directory.
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".podium").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Build the filter: `RUST_LOG`, then our defaults, then `PODIUM_LOG` extra directives.
pub fn env_filter(debug: bool) -> EnvFilter {
    let filter = EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into());

    let filter = env::var("PODIUM_LOG")
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
        .fold(filter, |filter, module_directive| match module_directive.parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(e) => {
                eprintln!("warning: invalid log directive '{}': {}", module_directive, e);
                filter
            }
        });

    if debug {
        ["podium_core=debug", "podium_dom=debug", "podium_events=debug", "podium_cli=debug"]
            .into_iter()
            .filter_map(|directive| directive.parse().ok())
            .fold(filter, EnvFilter::add_directive)
    } else {
        filter
    }
}

/// Stdout plus a daily rolling file. Safe to call more than once; later calls are no-ops.
pub fn setup_logging(log_dir: &Path, debug: bool) -> Result<()> {
    let _ = LogTracer::init();

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("podium")
        .filename_suffix("log")
        .max_log_files(5)
        .build(log_dir)
        .context("failed to open log file")?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let timer = fmt::time::ChronoLocal::new("%Y-%m-%dT%H:%M:%S%.6fZ".to_string());

    // stderr keeps stdout free for overlay markup and JSON dumps
    let registry = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(timer.clone())
                .with_target(false)
                .with_filter(env_filter(debug)),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_timer(timer)
                .with_ansi(false)
                .with_filter(env_filter(debug)),
        );

    if registry.try_init().is_ok() {
        let _ = FILE_GUARD.set(guard);
    }
    Ok(())
}
