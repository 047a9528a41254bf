use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::{LoggingConfig, ResolvedOutputs};

/// Targets the harness writes by default; `RUST_LOG` overrides the set.
const EVENT_TARGETS: [&str; 2] = ["craft_solver", "craft_bench"];

/// Keeps the background writer alive; dropping it flushes telemetry.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    pub telemetry_path: PathBuf,
}

/// Routes solver and turn events as JSON lines into the run's telemetry file.
/// Returns `None` when structured logging is off.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let telemetry_path = outputs.telemetry.clone();
    let (writer, guard) = telemetry_writer(&telemetry_path)?;
    let filter = event_filter(logging.level().unwrap_or(Level::INFO));

    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    // Already installed when several runs share a process.
    let _ = tracing::subscriber::set_global_default(subscriber);

    Ok(Some(LoggingGuard {
        _guard: guard,
        telemetry_path,
    }))
}

fn telemetry_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating telemetry directory at {}", dir.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("creating telemetry file at {}", path.display()))?;
    Ok(NonBlockingBuilder::default().lossy(false).finish(file))
}

fn event_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = EVENT_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",");
        EnvFilter::new(format!("warn,{directives}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_logging_installs_nothing() {
        let outputs = ResolvedOutputs {
            jsonl: PathBuf::from("unused/turns.jsonl"),
            summary_md: PathBuf::from("unused/summary.md"),
            telemetry: PathBuf::from("unused/telemetry.jsonl"),
        };
        let guard = init_logging(&LoggingConfig::default(), &outputs).expect("no I/O");
        assert!(guard.is_none());
        assert!(!outputs.telemetry.exists());
    }

    #[test]
    fn telemetry_writer_creates_missing_directories() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested/run/telemetry.jsonl");
        let (_writer, _guard) = telemetry_writer(&path).expect("writer");
        assert!(path.exists());
    }
}
