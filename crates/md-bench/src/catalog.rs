//! Benchmark families and their fixed job catalogs

use crate::command::RunInvocation;
use crate::config::EnginePaths;
use crate::gpu::GpuSelection;
use md_bench_common::metric::{GROMACS_NS_PER_DAY, NAMD_DAYS_PER_NS, NAMD_MEMORY_MB};
use md_bench_common::MetricRule;
use std::path::Path;

/// Files `gmx mdrun` leaves in its working directory after every run
const GROMACS_TRANSIENT_FILES: &[&str] = &["confout.gro", "ener.edr", "md.log", "state.cpt"];

const GROMACS_METRICS: &[MetricRule] = &[GROMACS_NS_PER_DAY];
const NAMD_METRICS: &[MetricRule] = &[NAMD_DAYS_PER_NS, NAMD_MEMORY_MB];

/// Engine family; each has its own command-line dialect and catalog
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Family {
    Gromacs,
    Namd,
}

/// Identity of one benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSpec {
    pub name: &'static str,
    pub family: Family,
    /// Input artifact, relative to the data directory
    pub input: &'static str,
    /// Simulation length passed to the engine; NAMD reads it from the input
    pub steps: Option<u32>,
    /// First entry is the performance metric
    pub metrics: &'static [MetricRule],
    /// Left behind in the working directory and removed after each run
    pub transient_files: &'static [&'static str],
}

const fn gromacs(name: &'static str, input: &'static str, steps: u32) -> JobSpec {
    JobSpec {
        name,
        family: Family::Gromacs,
        input,
        steps: Some(steps),
        metrics: GROMACS_METRICS,
        transient_files: GROMACS_TRANSIENT_FILES,
    }
}

const fn namd(name: &'static str, input: &'static str) -> JobSpec {
    JobSpec {
        name,
        family: Family::Namd,
        input,
        steps: None,
        metrics: NAMD_METRICS,
        transient_files: &[],
    }
}

static GROMACS_JOBS: [JobSpec; 3] = [
    gromacs("MEM", "gromacs/MEM/benchMEM.tpr", 10_000),
    gromacs("RIB", "gromacs/RIB/benchRIB.tpr", 1_000),
    gromacs("PEP", "gromacs/PEP/benchPEP.tpr", 500),
];

static NAMD_JOBS: [JobSpec; 3] = [
    namd("f1atpase", "namd/f1atpase/f1atpase.namd"),
    namd("apoa1", "namd/apoa1/apoa1.namd"),
    namd("stmv", "namd/stmv/stmv.namd"),
];

impl Family {
    pub fn jobs(self) -> &'static [JobSpec] {
        match self {
            Self::Gromacs => &GROMACS_JOBS,
            Self::Namd => &NAMD_JOBS,
        }
    }

    pub fn find(self, name: &str) -> Option<&'static JobSpec> {
        self.jobs().iter().find(|job| job.name == name)
    }

    /// Catalog names, comma-separated, for error messages
    pub fn job_names(self) -> String {
        self.jobs()
            .iter()
            .map(|job| job.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Engine executable for this family; NAMD has separate CUDA and CPU builds
    pub fn engine<'a>(self, engines: &'a EnginePaths, gpus: Option<&GpuSelection>) -> &'a Path {
        match (self, gpus) {
            (Self::Gromacs, _) => &engines.gromacs,
            (Self::Namd, Some(_)) => &engines.namd_gpu,
            (Self::Namd, None) => &engines.namd_cpu,
        }
    }
}

impl JobSpec {
    /// Command line for one repetition.
    ///
    /// `engine` and `input` are already resolved against the data directory.
    pub fn invocation(
        &self,
        engine: &Path,
        input: &Path,
        cores: u32,
        gpus: Option<&GpuSelection>,
    ) -> RunInvocation {
        let input = input.display().to_string();
        let invocation = RunInvocation::new(engine);

        match self.family {
            Family::Gromacs => {
                let device = match gpus {
                    Some(ids) => ["-gpu_id".to_string(), ids.to_string()],
                    None => ["-nb".to_string(), "cpu".to_string()],
                };
                let mut invocation = invocation
                    .args(["gmx", "mdrun"])
                    .args(device)
                    .args(["-ntomp".to_string(), cores.to_string()])
                    .args(["-s".to_string(), input]);
                if let Some(steps) = self.steps {
                    invocation = invocation.args(["-nsteps".to_string(), steps.to_string()]);
                }
                invocation
            }
            Family::Namd => {
                let invocation = invocation.arg(format!("+p{cores}")).arg("+setcpuaffinity");
                match gpus {
                    Some(ids) => invocation
                        .args(["+idlepoll", "+isomalloc_sync", "+devices"])
                        .arg(ids.to_string())
                        .arg(input),
                    None => invocation.arg(input),
                }
            }
        }
    }
}
