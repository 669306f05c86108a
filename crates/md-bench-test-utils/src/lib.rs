//! Shared test utilities for md-bench
//!
//! Integration tests run the harness against small shell scripts standing in
//! for the real engines, inside a throwaway data directory laid out the way
//! the benchmark suite ships (`gromacs/<job>/...`, `namd/<job>/...`).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary data directory holding job inputs and fake engines
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Default result document location inside the workspace
    pub fn output_path(&self) -> PathBuf {
        self.path().join("results.json")
    }

    /// Create a placeholder input artifact at a data-relative path
    pub fn add_input(&self, relative: &str) -> PathBuf {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create input dir");
        }
        fs::write(&path, "placeholder input\n").expect("failed to write input");
        path
    }

    /// Write an executable `/bin/sh` script at a data-relative path
    pub fn script(&self, relative: &str, body: &str) -> PathBuf {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create script dir");
        }
        // Handle closed before the mode change; the runner retries any
        // ETXTBSY left by a concurrent fork still holding it
        {
            let mut file = fs::File::create(&path).expect("failed to create script");
            write!(file, "#!/bin/sh\n{body}\n").expect("failed to write script");
            file.sync_all().expect("failed to sync script");
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("failed to make script executable");
        }
        path
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Shell snippet printing each line verbatim to stdout
pub fn print_lines(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| format!("printf '%s\\n' '{}'", line.replace('\'', r"'\''")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// GROMACS log tail reporting `ns_per_day`
pub fn gromacs_performance_line(ns_per_day: f64) -> String {
    format!("Performance:     {ns_per_day}        0.498")
}

/// NAMD benchmark line reporting `days_per_ns` and `memory_mb`
pub fn namd_benchmark_line(days_per_ns: f64, memory_mb: f64) -> String {
    format!("Info: Benchmark time: 8 CPUs 0.0213 s/step {days_per_ns} days/ns {memory_mb} MB memory")
}
