//! Execution of OS inventory queries

use crate::error::ProbeError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Runs OS-native inventory queries
///
/// Implementations return the raw stdout of a command or the contents of a
/// file. Normalization happens in the collectors, never here.
pub trait ProbeRunner: Send + Sync {
    /// Run a command to completion and return its stdout
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError>;

    /// Read a small text file (procfs, sysfs)
    fn read(&self, path: &Path) -> Result<String, ProbeError>;
}

/// Display form of a probe command, used as the lookup key and in errors
pub fn probe_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs probes against the real host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl ProbeRunner for SystemProbe {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let command = probe_command(program, args);
        debug!(command = %command, "Running inventory probe");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| ProbeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::ExitStatus {
                command,
                status: output.status.to_string(),
            });
        }

        if !output.stderr.is_empty() {
            debug!(
                command = %command,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Probe wrote to stderr"
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(ProbeError::EmptyOutput { command });
        }

        Ok(stdout)
    }

    fn read(&self, path: &Path) -> Result<String, ProbeError> {
        std::fs::read_to_string(path).map_err(|source| ProbeError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Serves canned probe output; anything not registered fails like a missing tool
#[derive(Debug, Default, Clone)]
pub struct StaticProbe {
    commands: HashMap<String, String>,
    files: HashMap<PathBuf, String>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register stdout for a command given in display form (`"lscpu"`, `"wmic os get ..."`)
    pub fn command(mut self, command: &str, stdout: &str) -> Self {
        self.commands.insert(command.to_string(), stdout.to_string());
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.files.insert(path.into(), contents.to_string());
        self
    }
}

impl ProbeRunner for StaticProbe {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let command = probe_command(program, args);
        match self.commands.get(&command) {
            Some(stdout) if stdout.trim().is_empty() => Err(ProbeError::EmptyOutput { command }),
            Some(stdout) => Ok(stdout.clone()),
            None => Err(ProbeError::Spawn {
                command,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not registered"),
            }),
        }
    }

    fn read(&self, path: &Path) -> Result<String, ProbeError> {
        self.files.get(path).cloned().ok_or_else(|| ProbeError::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not registered"),
        })
    }
}
