//! Harness error types
//!
//! Each layer has its own typed error so callers can tell a local, recoverable
//! failure (one job, one probe, one write) from one that ends the sweep.

use md_bench_common::StatsError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of a single engine invocation
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The executable could not be started (missing path, permission denied)
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading output or waiting for the process failed
    #[error("I/O error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The run exceeded its timeout and was killed
    #[error("'{command}' timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },

    /// The run was cancelled (Ctrl-C) and killed
    #[error("'{command}' was cancelled")]
    Cancelled { command: String },
}

impl RunnerError {
    /// Whether the whole sweep should stop rather than just this job
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// A marker line matched a rule's prefix but its field was unusable
#[derive(Debug, Error, PartialEq)]
#[error("cannot read field {field} of line '{line}': {reason}")]
pub struct ExtractError {
    pub line: String,
    pub field: usize,
    pub reason: String,
}

/// Failures that end one job; sibling jobs continue
#[derive(Debug, Error)]
pub enum JobError {
    #[error("unknown benchmark '{name}' (available: {available})")]
    UnknownJob { name: String, available: String },

    #[error("input for benchmark '{name}' does not exist: {}", .path.display())]
    MissingInput { name: String, path: PathBuf },

    #[error("benchmark '{name}' needs at least one repetition")]
    NoRepetitions { name: String },

    #[error("benchmark '{name}' run {repetition} failed: {source}")]
    Runner {
        name: String,
        repetition: u32,
        #[source]
        source: RunnerError,
    },

    #[error("benchmark '{name}': {source}")]
    Stats {
        name: String,
        #[source]
        source: StatsError,
    },
}

impl JobError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Runner { source, .. } if source.is_cancelled())
    }
}

/// Result document read/write failures, always naming the file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read results file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write results file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse results file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize results for '{}': {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("results file '{}' is malformed: {detail}", .path.display())]
    Malformed { path: PathBuf, detail: String },
}

/// Failure of one inventory query; degrades a single field
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}")]
    ExitStatus { command: String, status: String },

    #[error("'{command}' produced no output")]
    EmptyOutput { command: String },

    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' output has no '{field}'")]
    MissingField { command: String, field: String },

    #[error("'{command}' reported unusable {field} '{value}'")]
    Unparsable {
        command: String,
        field: String,
        value: String,
    },
}

/// Inventory collection cannot start on this host
#[derive(Debug, Error, PartialEq)]
pub enum InventoryError {
    #[error("unsupported operating system '{0}', no inventory collector available")]
    UnsupportedOs(String),
}

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config file '{}': {report}", .path.display())]
    Invalid { path: PathBuf, report: String },
}
