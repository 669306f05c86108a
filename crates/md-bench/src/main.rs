//! md-bench: GROMACS and NAMD benchmark harness
//!
//! Runs a family's jobs on this host, prints per-job summaries and appends
//! every result to a JSON document that also records the host inventory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use md_bench::benchmark::RunContext;
use md_bench::catalog::Family;
use md_bench::config::HarnessConfig;
use md_bench::gpu::GpuSelection;
use md_bench::logging::{StdoutSink, init_tracing};
use md_bench::sysinfo::{SystemProbe, host_collector};
use md_bench::{report, results, sweep};
use md_bench_common::Metadata;
use md_bench_common::defaults::{DEFAULT_OUTPUT, DEFAULT_REPEATS};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const SUITE: &str = "md-bench";

#[derive(Parser, Debug)]
#[command(name = "md-bench")]
#[command(about = "Benchmark molecular-dynamics engines on this host")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Options shared by every benchmark family
#[derive(clap::Args, Debug)]
struct BenchArgs {
    /// Jobs to run (default: every job in the family's catalog)
    jobs: Vec<String>,

    /// Repetitions per job
    #[arg(short, long, default_value_t = DEFAULT_REPEATS, value_parser = clap::value_parser!(u32).range(1..))]
    repeats: u32,

    /// Don't print per-job and final result tables
    #[arg(long)]
    silent: bool,

    /// Result document to write
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Threads handed to the engine (default: all logical CPUs)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    cores: Option<u32>,

    /// Comma-separated GPU ids (e.g. "0,1"); runs on CPU when absent
    #[arg(short, long)]
    gpus: Option<GpuSelection>,

    /// List the family's jobs and exit
    #[arg(short, long)]
    list: bool,

    /// Core counts to sweep, each run and persisted in the given order
    #[arg(long, num_args = 1.., value_parser = clap::value_parser!(u32).range(1..))]
    scaling: Vec<u32>,

    /// Per-run timeout in seconds, 0 disables (default: 7200 or the config file's)
    #[arg(long)]
    timeout: Option<u64>,

    /// JSON harness configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory job inputs and relative engine paths resolve against
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// GROMACS launcher
    #[arg(long, env = "MD_BENCH_GROMACS")]
    gromacs: Option<PathBuf>,

    /// NAMD CUDA build, used when GPUs are selected
    #[arg(long, env = "MD_BENCH_NAMD_GPU")]
    namd_gpu: Option<PathBuf>,

    /// NAMD CPU build
    #[arg(long, env = "MD_BENCH_NAMD_CPU")]
    namd_cpu: Option<PathBuf>,
}

impl BenchArgs {
    /// Config file (or defaults) with command-line overrides applied
    fn harness_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };

        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(path) = &self.gromacs {
            config.engines.gromacs = path.clone();
        }
        if let Some(path) = &self.namd_gpu {
            config.engines.namd_gpu = path.clone();
        }
        if let Some(path) = &self.namd_cpu {
            config.engines.namd_cpu = path.clone();
        }
        Ok(config)
    }

    fn job_names(&self, family: Family) -> Vec<String> {
        if self.jobs.is_empty() {
            family.jobs().iter().map(|job| job.name.to_string()).collect()
        } else {
            self.jobs.clone()
        }
    }

    fn core_counts(&self) -> Vec<u32> {
        if !self.scaling.is_empty() {
            return self.scaling.clone();
        }
        let cores = self.cores.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX))
        });
        vec![cores]
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run GROMACS benchmarks (MEM, RIB, PEP)
    Gromacs(Box<BenchArgs>),

    /// Run NAMD benchmarks (f1atpase, apoa1, stmv)
    Namd(Box<BenchArgs>),

    /// Print this host's inventory
    Specs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    match args.command {
        Command::Gromacs(bench) => run_family(Family::Gromacs, *bench).await,
        Command::Namd(bench) => run_family(Family::Namd, *bench).await,
        Command::Specs => {
            let collector = host_collector()?;
            report::print_specs(&collector.collect());
            Ok(())
        }
    }
}

async fn run_family(family: Family, args: BenchArgs) -> Result<()> {
    if args.list {
        report::print_catalog(family);
        return Ok(());
    }

    let config = args.harness_config()?;
    let gpus = args.gpus.as_ref();
    let engine = config.resolve(family.engine(&config.engines, gpus));

    let collector = host_collector()?;
    info!(collector = collector.name(), "Collecting host inventory");
    let specs = collector
        .collect()
        .with_engine(engine.display().to_string());
    let meta = Metadata::new(SUITE, env!("CARGO_PKG_VERSION"), family.to_string())
        .with_extra(config.meta.clone());

    if !args.silent {
        report::print_specs(&specs);
    }
    results::initialize(&args.output, &meta, &specs)
        .with_context(|| format!("Failed to initialize {}", args.output.display()))?;

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after killing the running engine");
            cancel_on_signal.cancel();
        }
    });

    let jobs = args.job_names(family);
    let core_counts = args.core_counts();
    info!(
        family = %family,
        jobs = ?jobs,
        core_counts = ?core_counts,
        repeats = args.repeats,
        gpus = ?gpus.map(ToString::to_string),
        output = %args.output.display(),
        "Starting benchmark"
    );

    let ctx = RunContext::new(config, Arc::new(StdoutSink), Arc::new(SystemProbe), cancel)
        .silent(args.silent);
    let outcome = sweep::sweep(
        &jobs,
        family,
        &core_counts,
        args.repeats,
        gpus,
        &ctx,
        &args.output,
    )
    .await;

    if !args.silent {
        report::print_results(&outcome.records);
    }
    for (cores, e) in &outcome.unpersisted {
        error!(cores, error = %e, "Results for this configuration were not saved");
    }

    if outcome.cancelled {
        anyhow::bail!("Benchmark cancelled");
    }
    if !outcome.is_clean() {
        anyhow::bail!(
            "{} job(s) failed, {} configuration(s) not saved",
            outcome.failures.len(),
            outcome.unpersisted.len()
        );
    }

    info!(records = outcome.records.len(), "Benchmark complete");
    Ok(())
}
