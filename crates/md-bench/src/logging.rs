//! Live echo of engine output and tracing setup
//!
//! Every line an engine prints is pushed through a [`LineSink`] as soon as it
//! arrives, so long runs show progress instead of going silent until exit.

use std::sync::Mutex;

/// Destination for echoed subprocess output lines
pub trait LineSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Echoes lines to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&self, line: &str) {
        println!("{}", line.trim());
    }
}

/// Discards lines
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LineSink for NullSink {
    fn write_line(&self, _line: &str) {}
}

/// Keeps lines in memory in arrival order
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines written so far
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line.to_string()),
            Err(poisoned) => poisoned.into_inner().push(line.to_string()),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr so stdout carries only echoed engine output and result
/// tables. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
