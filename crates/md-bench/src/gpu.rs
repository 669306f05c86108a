//! NVIDIA GPU selection and discovery

use crate::sysinfo::ProbeRunner;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const NVIDIA_SMI: &str = "nvidia-smi";
const NVIDIA_SMI_QUERY: &[&str] = &["--query-gpu=name,index", "--format=csv,noheader"];

/// GPU device ids handed to the engine (`0,1,2`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuSelection(Vec<u32>);

impl fmt::Display for GpuSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&ids.join(","))
    }
}

impl FromStr for GpuSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ids = s
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                id.parse::<u32>()
                    .map_err(|_| format!("invalid GPU index '{id}'"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if ids.is_empty() {
            return Err("at least one GPU index is required".to_string());
        }
        Ok(Self(ids))
    }
}

/// Installed NVIDIA GPUs as a flat list of alternating name and index tokens.
///
/// Returns an empty list when `nvidia-smi` is missing or fails; GPU discovery
/// never aborts a benchmark.
pub fn nv_gpu_info(probe: &dyn ProbeRunner) -> Vec<String> {
    match probe.run(NVIDIA_SMI, NVIDIA_SMI_QUERY) {
        Ok(stdout) => parse_gpu_list(&stdout),
        Err(e) => {
            debug!(error = %e, "nvidia-smi unavailable, reporting no GPUs");
            Vec::new()
        }
    }
}

fn parse_gpu_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysinfo::StaticProbe;

    #[test]
    fn test_selection_parse_and_display() {
        let selection: GpuSelection = "0, 1,3".parse().unwrap();
        assert_eq!(selection, GpuSelection(vec![0, 1, 3]));
        assert_eq!(selection.to_string(), "0,1,3");
    }

    #[test]
    fn test_selection_rejects_garbage() {
        assert!("gpu0".parse::<GpuSelection>().is_err());
        assert!("".parse::<GpuSelection>().is_err());
    }

    #[test]
    fn test_gpu_list_flattened() {
        let probe = StaticProbe::new().command(
            "nvidia-smi --query-gpu=name,index --format=csv,noheader",
            "NVIDIA GeForce RTX 4090, 0\nNVIDIA RTX A6000, 1\n",
        );
        assert_eq!(
            nv_gpu_info(&probe),
            vec!["NVIDIA GeForce RTX 4090", "0", "NVIDIA RTX A6000", "1"]
        );
    }

    #[test]
    fn test_missing_tool_is_empty_list() {
        assert!(nv_gpu_info(&StaticProbe::new()).is_empty());
    }
}
