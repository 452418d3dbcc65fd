use anyhow::{anyhow, Result};
use clap::ValueEnum;
use std::io;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum LogLevel {
    No,
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> Option<Level> {
        match self {
            LogLevel::No => None,
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Warning => Some(Level::WARN),
            LogLevel::Error => Some(Level::ERROR),
        }
    }
}

/// Installs the global subscriber. Logs go to stdout unless `log_file` is set,
/// in which case they go to a daily rolling file in the working directory.
///
/// The returned guard flushes the file writer and must be kept alive.
pub fn init_logger(log_level: LogLevel, log_file: &str) -> Result<Option<WorkerGuard>> {
    let Some(level) = log_level.to_tracing_level() else {
        return Ok(None);
    };

    let (writer, guard) = log_writer(log_file);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(LevelFilter::from_level(level).into()))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(guard.is_none())
                .with_target(false)
                .with_file(false),
        )
        .try_init()
        .map_err(|err| anyhow!("Couldn't set log subscriber: {}", err))?;

    Ok(guard)
}

fn log_writer(log_file: &str) -> (BoxMakeWriter, Option<WorkerGuard>) {
    if log_file.is_empty() {
        return (BoxMakeWriter::new(io::stdout), None);
    }

    let (non_blocking, guard) = tracing_appender::non_blocking(rolling::daily(".", log_file));
    (BoxMakeWriter::new(non_blocking), Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_level_disables_logging() {
        assert_eq!(LogLevel::No.to_tracing_level(), None);
        assert!(init_logger(LogLevel::No, "").unwrap().is_none());
    }

    #[test]
    fn stdout_is_the_default_writer() {
        let (_, guard) = log_writer("");
        assert!(guard.is_none());
    }

    #[test]
    fn file_writer_keeps_a_guard() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plug-watch.log");

        let (_, guard) = log_writer(&file.to_string_lossy());
        assert!(guard.is_some());
    }

    #[test]
    fn warning_maps_to_warn() {
        assert_eq!(LogLevel::Warning.to_tracing_level(), Some(Level::WARN));
    }
}
