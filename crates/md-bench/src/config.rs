//! Harness configuration loading from JSON
//!
//! Everything here is optional; a missing config file means defaults that
//! match the directory layout the benchmark suite ships with.

use crate::error::ConfigError;
use md_bench_common::defaults::default_run_timeout;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default GROMACS launcher, relative to the data directory
pub const DEFAULT_GROMACS_PATH: &str = "gromacs/gromacs-ngc.run";

/// Default NAMD CUDA build, relative to the data directory
pub const DEFAULT_NAMD_GPU_PATH: &str = "namd/NAMD_2.14_Linux-x86_64-multicore-CUDA/namd2";

/// Default NAMD CPU build, relative to the data directory
pub const DEFAULT_NAMD_CPU_PATH: &str = "namd/NAMD_2.14_Linux-x86_64-multicore/namd2";

/// Engine executables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields, default)]
pub struct EnginePaths {
    #[garde(custom(non_empty_path))]
    pub gromacs: PathBuf,
    #[garde(custom(non_empty_path))]
    pub namd_gpu: PathBuf,
    #[garde(custom(non_empty_path))]
    pub namd_cpu: PathBuf,
}

impl Default for EnginePaths {
    fn default() -> Self {
        Self {
            gromacs: PathBuf::from(DEFAULT_GROMACS_PATH),
            namd_gpu: PathBuf::from(DEFAULT_NAMD_GPU_PATH),
            namd_cpu: PathBuf::from(DEFAULT_NAMD_CPU_PATH),
        }
    }
}

/// Harness configuration loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields, default)]
pub struct HarnessConfig {
    /// Root that relative job inputs and engine paths resolve against
    #[garde(custom(non_empty_path))]
    pub data_dir: PathBuf,

    /// Directory engines run in; defaults to the current directory
    #[garde(skip)]
    pub work_dir: Option<PathBuf>,

    #[garde(dive)]
    pub engines: EnginePaths,

    /// Per-run timeout in seconds (0 disables)
    #[garde(skip)]
    pub timeout_secs: u64,

    /// Environment for engine processes; inherited when absent
    #[garde(custom(valid_env))]
    pub env: Option<BTreeMap<String, String>>,

    /// Extra fields merged into the document's `meta` block
    #[garde(skip)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            work_dir: None,
            engines: EnginePaths::default(),
            timeout_secs: default_run_timeout(),
            env: None,
            meta: serde_json::Map::new(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        garde::Validate::validate(&config).map_err(|report| ConfigError::Invalid {
            path: path.to_path_buf(),
            report: report.to_string(),
        })?;

        Ok(config)
    }

    /// Resolve a path from the catalog or config against the data directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

fn non_empty_path(value: &PathBuf, _ctx: &()) -> garde::Result {
    if value.as_os_str().is_empty() {
        return Err(garde::Error::new("path cannot be empty"));
    }
    Ok(())
}

fn valid_env(value: &Option<BTreeMap<String, String>>, _ctx: &()) -> garde::Result {
    let Some(env) = value else {
        return Ok(());
    };
    for key in env.keys() {
        if key.is_empty() || key.contains('=') {
            return Err(garde::Error::new(format!(
                "invalid environment variable name '{key}'"
            )));
        }
    }
    Ok(())
}
