//! Scaling sweep: one full batch per core count, persisted as it completes

use crate::benchmark::{RunContext, RunParams, run_jobs};
use crate::catalog::Family;
use crate::error::{JobError, StoreError};
use crate::gpu::GpuSelection;
use crate::results;
use md_bench_common::SummaryRecord;
use std::path::Path;
use tracing::{error, info, warn};

/// What a sweep produced
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Every completed record, in execution order
    pub records: Vec<SummaryRecord>,
    pub failures: Vec<JobError>,
    /// Core counts whose records could not be written
    pub unpersisted: Vec<(u32, StoreError)>,
    pub cancelled: bool,
}

impl SweepReport {
    /// Whether every job ran and every record reached disk
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unpersisted.is_empty() && !self.cancelled
    }
}

/// Run `jobs` once per entry of `core_counts`, appending each configuration's
/// records to `output` before moving on.
///
/// Core counts are used exactly as given; duplicates and any order are
/// allowed. A cancelled configuration is not persisted and ends the sweep.
/// A failed append is reported and the sweep continues.
pub async fn sweep(
    jobs: &[String],
    family: Family,
    core_counts: &[u32],
    repeats: u32,
    gpus: Option<&GpuSelection>,
    ctx: &RunContext,
    output: &Path,
) -> SweepReport {
    let mut report = SweepReport::default();

    for (index, &cores) in core_counts.iter().enumerate() {
        info!(
            cores,
            configuration = index + 1,
            total_configurations = core_counts.len(),
            "Starting configuration"
        );

        let params = RunParams {
            repeats,
            cores,
            gpus: gpus.cloned(),
        };
        let batch = run_jobs(jobs, family, &params, ctx).await;
        report.failures.extend(batch.failures);

        if batch.cancelled {
            warn!(
                cores,
                completed = batch.records.len(),
                "Sweep cancelled, configuration not persisted"
            );
            report.cancelled = true;
            break;
        }

        if !batch.records.is_empty() {
            match results::append(output, &batch.records) {
                Ok(total) => info!(cores, appended = batch.records.len(), total, "Configuration persisted"),
                Err(e) => {
                    error!(cores, error = %e, "Failed to persist configuration, continuing");
                    report.unpersisted.push((cores, e));
                }
            }
        }
        report.records.extend(batch.records);
    }

    report
}
