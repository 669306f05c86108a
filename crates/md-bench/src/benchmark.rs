//! Repetition and statistics engine
//!
//! Runs one job `repeats` times, times each run, pools the extracted metric
//! samples across runs and reduces everything into a [`SummaryRecord`].
//! Jobs and repetitions run strictly one after another: concurrent runs would
//! contend for the same cores and invalidate the timings.

use crate::catalog::{Family, JobSpec};
use crate::command::{CommandConfig, run_command_streaming};
use crate::config::HarnessConfig;
use crate::error::JobError;
use crate::extract::extract;
use crate::gpu::{GpuSelection, nv_gpu_info};
use crate::logging::LineSink;
use crate::report;
use crate::sysinfo::ProbeRunner;
use md_bench_common::defaults::{MEMORY_PRECISION, PERFORMANCE_PRECISION, TIME_PRECISION};
use md_bench_common::stats::{metric_median, round_to};
use md_bench_common::{MetricKind, SummaryRecord, TimingStats};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Per-configuration parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    pub repeats: u32,
    pub cores: u32,
    pub gpus: Option<GpuSelection>,
}

/// Everything a run needs besides the job and its parameters; built once per
/// invocation and shared by reference
pub struct RunContext {
    pub config: HarnessConfig,
    pub command: CommandConfig,
    /// Receives every engine output line as it arrives
    pub sink: Arc<dyn LineSink>,
    pub probe: Arc<dyn ProbeRunner>,
    pub cancel: CancellationToken,
    /// Suppress the per-job summary table
    pub silent: bool,
}

impl RunContext {
    pub fn new(
        config: HarnessConfig,
        sink: Arc<dyn LineSink>,
        probe: Arc<dyn ProbeRunner>,
        cancel: CancellationToken,
    ) -> Self {
        let command = CommandConfig::with_timeout_secs(config.timeout_secs);
        Self {
            config,
            command,
            sink,
            probe,
            cancel,
            silent: false,
        }
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Directory the engine runs in and leaves its transient files in
    fn work_dir(&self) -> &Path {
        self.config.work_dir.as_deref().unwrap_or(Path::new("."))
    }
}

/// Outcome of one batch of jobs at a single core count
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Completed jobs, in the order they ran
    pub records: Vec<SummaryRecord>,
    pub failures: Vec<JobError>,
    /// Set when a cancellation stopped the batch early
    pub cancelled: bool,
}

/// Run every repetition of one job and reduce them to a summary record.
///
/// # Errors
/// * `NoRepetitions` when `repeats` is zero
/// * `MissingInput` before any run when the input artifact does not exist
/// * `Runner` when a repetition cannot be spawned, times out or is cancelled
/// * `Stats` when a metric collected no samples over all repetitions
pub async fn run_job(
    job: &JobSpec,
    params: &RunParams,
    ctx: &RunContext,
) -> Result<SummaryRecord, JobError> {
    if params.repeats == 0 {
        return Err(JobError::NoRepetitions {
            name: job.name.to_string(),
        });
    }

    let input = ctx.config.resolve(Path::new(job.input));
    if !input.exists() {
        return Err(JobError::MissingInput {
            name: job.name.to_string(),
            path: input,
        });
    }

    let gpus = params.gpus.as_ref();
    let engine = ctx
        .config
        .resolve(job.family.engine(&ctx.config.engines, gpus));
    let invocation = job
        .invocation(&engine, &input, params.cores, gpus)
        .env(ctx.config.env.clone())
        .working_dir(ctx.config.work_dir.clone());
    let commandline = invocation.command_line();

    let mut timings = Vec::with_capacity(params.repeats as usize);
    let mut pools: Vec<Vec<f64>> = vec![Vec::new(); job.metrics.len()];

    for repetition in 1..=params.repeats {
        info!(
            job = job.name,
            cores = params.cores,
            repetition,
            repeats = params.repeats,
            "Starting repetition"
        );

        let result = run_command_streaming(&invocation, ctx.sink.as_ref(), &ctx.command, &ctx.cancel).await;
        cleanup_transient_files(job, ctx.work_dir());
        let output = result.map_err(|source| JobError::Runner {
            name: job.name.to_string(),
            repetition,
            source,
        })?;

        let elapsed = output.elapsed.as_secs_f64();
        timings.push(elapsed);
        if !output.success() {
            warn!(
                job = job.name,
                repetition,
                exit_code = output.exit_code,
                "Engine exited unsuccessfully, keeping its output"
            );
        }

        for (metric, pool) in job.metrics.iter().zip(pools.iter_mut()) {
            match extract(&output.text, &metric.rule) {
                Ok(samples) if samples.is_empty() => {
                    warn!(
                        job = job.name,
                        repetition,
                        metric = %metric.kind,
                        prefix = metric.rule.prefix,
                        "No metric lines in output"
                    );
                }
                Ok(samples) => {
                    debug!(job = job.name, repetition, metric = %metric.kind, ?samples, "Extracted samples");
                    pool.extend(samples);
                }
                // A malformed marker line discards this run's samples for the metric
                Err(e) => {
                    error!(
                        job = job.name,
                        repetition,
                        metric = %metric.kind,
                        error = %e,
                        "Discarding unparsable metric output"
                    );
                }
            }
        }

        info!(
            job = job.name,
            repetition,
            elapsed_secs = elapsed,
            "Repetition complete"
        );
    }

    let stats_err = |source| JobError::Stats {
        name: job.name.to_string(),
        source,
    };
    let timing = TimingStats::from_durations(&timings)
        .map_err(stats_err)?
        .rounded(TIME_PRECISION);

    let mut record = SummaryRecord {
        name: job.name.to_string(),
        num_processes: params.cores,
        nv_gpus_available: gpu_inventory(ctx).await,
        gpu_index_used: params.gpus.as_ref().map(ToString::to_string),
        commandline,
        min_time: timing.min,
        max_time: timing.max,
        median_time: timing.median,
        standard_deviation: timing.std_dev,
        performance: 0.0,
        performance_unit: String::new(),
        memory_usage: None,
        memory_unit: None,
    };

    for (metric, pool) in job.metrics.iter().zip(&pools) {
        let value = metric_median(metric.kind.as_ref(), pool).map_err(stats_err)?;
        match metric.kind {
            MetricKind::Performance => {
                record.performance = round_to(value, PERFORMANCE_PRECISION);
                record.performance_unit = metric.unit.to_string();
            }
            MetricKind::MemoryUsage => {
                record.memory_usage = Some(round_to(value, MEMORY_PRECISION));
                record.memory_unit = Some(metric.unit.to_string());
            }
        }
    }

    Ok(record)
}

/// Run named jobs from a family's catalog at one core count.
///
/// Unknown names and failed jobs are collected and the batch moves on; only
/// a cancellation stops it early.
pub async fn run_jobs(
    names: &[String],
    family: Family,
    params: &RunParams,
    ctx: &RunContext,
) -> BatchReport {
    let mut report = BatchReport::default();

    for name in names {
        if ctx.cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let Some(job) = family.find(name) else {
            let err = JobError::UnknownJob {
                name: name.clone(),
                available: family.job_names(),
            };
            error!(error = %err, "Skipping job");
            report.failures.push(err);
            continue;
        };

        match run_job(job, params, ctx).await {
            Ok(record) => {
                info!(
                    job = job.name,
                    cores = params.cores,
                    median_time = record.median_time,
                    performance = record.performance,
                    unit = %record.performance_unit,
                    "Job complete"
                );
                if !ctx.silent {
                    report::print_summary(&record);
                }
                report.records.push(record);
            }
            Err(e) if e.is_cancelled() => {
                warn!(job = job.name, "Job cancelled");
                report.failures.push(e);
                report.cancelled = true;
                break;
            }
            Err(e) => {
                error!(job = job.name, error = %e, "Job failed");
                report.failures.push(e);
            }
        }
    }

    report
}

/// nvidia-smi runs on a blocking thread so a slow driver never stalls the runtime
async fn gpu_inventory(ctx: &RunContext) -> Vec<String> {
    let probe = Arc::clone(&ctx.probe);
    tokio::task::spawn_blocking(move || nv_gpu_info(probe.as_ref()))
        .await
        .unwrap_or_default()
}

/// Best-effort removal of files the engine leaves behind
fn cleanup_transient_files(job: &JobSpec, dir: &Path) {
    for name in job.transient_files {
        let path = dir.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed transient file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Transient file not present");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove transient file"),
        }
    }
}
