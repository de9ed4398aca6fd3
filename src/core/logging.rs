use crate::shared::paths::ensure_dir;
use std::path::Path;
use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Targets that get their own log file. Everything else lands in `system.log`.
const ROUTED_TARGETS: [&str; 1] = ["tasks"];

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create logs directory: {0}")]
    Directory(#[from] std::io::Error),
    #[error("Failed to set global tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Keeps the non-blocking writers flushing. Drop it on shutdown.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

struct TargetWriter {
    writers: Vec<(String, NonBlocking)>,
    system_writer: NonBlocking,
}

impl TargetWriter {
    fn writer_for_target(&self, target: &str) -> NonBlocking {
        for (name, writer) in &self.writers {
            if target == name || target.starts_with(&format!("{}::", name)) {
                return writer.clone();
            }
        }

        self.system_writer.clone()
    }
}

impl<'a> MakeWriter<'a> for TargetWriter {
    type Writer = NonBlocking;

    fn make_writer(&'a self) -> Self::Writer {
        self.system_writer.clone()
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        self.writer_for_target(meta.target())
    }
}

/// Installs the global subscriber writing daily-rotated files under `log_dir`.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(log_dir: &Path, level: &str) -> Result<LoggingGuards, LoggingError> {
    ensure_dir(log_dir)?;

    let mut guards = Vec::new();
    let mut writers = Vec::new();

    for target in ROUTED_TARGETS {
        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, log_dir, format!("{}.log", target));
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        writers.push((target.to_string(), non_blocking));
        guards.push(guard);
    }

    let system_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "system.log");
    let (system_writer, system_guard) = tracing_appender::non_blocking(system_appender);
    guards.push(system_guard);

    let writer = TargetWriter {
        writers,
        system_writer,
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false),
    );

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(target: "system", "Logging initialized at {:?}", log_dir);

    Ok(LoggingGuards { _guards: guards })
}
