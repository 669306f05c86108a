//! End-to-end tests for the benchmark harness
//!
//! Engines are replaced by `/bin/sh` scripts that print canned GROMACS / NAMD
//! output, so these run anywhere with a POSIX shell.

#![cfg(unix)]

use md_bench::benchmark::{RunContext, RunParams, run_job, run_jobs};
use md_bench::catalog::Family;
use md_bench::command::CommandConfig;
use md_bench::config::{EnginePaths, HarnessConfig};
use md_bench::error::{JobError, RunnerError};
use md_bench::logging::{MemorySink, NullSink};
use md_bench::results;
use md_bench::sweep::sweep;
use md_bench::sysinfo::StaticProbe;
use md_bench_common::StatsError;
use md_bench_test_utils::{Workspace, gromacs_performance_line, namd_benchmark_line, print_lines};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ENGINE: &str = "bin/engine";

fn harness(ws: &Workspace, engine: &Path) -> HarnessConfig {
    HarnessConfig {
        data_dir: ws.path().to_path_buf(),
        work_dir: Some(ws.path().to_path_buf()),
        engines: EnginePaths {
            gromacs: engine.to_path_buf(),
            namd_gpu: engine.to_path_buf(),
            namd_cpu: engine.to_path_buf(),
        },
        ..HarnessConfig::default()
    }
}

fn context(config: HarnessConfig) -> RunContext {
    RunContext::new(
        config,
        Arc::new(NullSink),
        Arc::new(StaticProbe::new()),
        CancellationToken::new(),
    )
    .silent(true)
}

/// Workspace with every GROMACS input and an engine running `body`
fn gromacs_workspace(body: &str) -> (Workspace, RunContext) {
    let ws = Workspace::new();
    for job in Family::Gromacs.jobs() {
        ws.add_input(job.input);
    }
    let engine = ws.script(ENGINE, body);
    let ctx = context(harness(&ws, &engine));
    (ws, ctx)
}

fn params(repeats: u32, cores: u32) -> RunParams {
    RunParams {
        repeats,
        cores,
        gpus: None,
    }
}

fn names(jobs: &[&str]) -> Vec<String> {
    jobs.iter().map(|s| s.to_string()).collect()
}

mod run_job_tests {
    use super::*;

    #[tokio::test]
    async fn test_timing_order_holds_for_every_repeat_count() {
        let (_ws, ctx) = gromacs_workspace(&print_lines(&[&gromacs_performance_line(48.2)]));
        let job = Family::Gromacs.find("MEM").unwrap();

        for repeats in 1..=4 {
            let record = run_job(job, &params(repeats, 2), &ctx).await.unwrap();
            assert!(record.min_time <= record.median_time);
            assert!(record.median_time <= record.max_time);
            if repeats == 1 {
                assert_eq!(record.standard_deviation, 0.0);
                assert_eq!(record.min_time, record.max_time);
            }
            assert_eq!(record.performance, 48.2);
            assert_eq!(record.performance_unit, "ns/day");
        }
    }

    #[tokio::test]
    async fn test_samples_are_pooled_across_repetitions() {
        // First run reports 12.345, every later run 12.355
        let body = format!(
            "if [ -f called ]; then\n{}\nelse\n: > called\n{}\nfi",
            print_lines(&[&gromacs_performance_line(12.355)]),
            print_lines(&[&gromacs_performance_line(12.345)]),
        );
        let (_ws, ctx) = gromacs_workspace(&body);
        let job = Family::Gromacs.find("RIB").unwrap();

        let record = run_job(job, &params(2, 4), &ctx).await.unwrap();
        assert_eq!(record.performance, 12.35);
        assert_eq!(record.num_processes, 4);
        assert!(record.commandline.contains("-ntomp 4 -s "));
        assert!(record.commandline.contains("benchRIB.tpr -nsteps 1000"));
    }

    #[tokio::test]
    async fn test_repeated_marker_lines_all_count() {
        let lines = [
            gromacs_performance_line(10.0),
            gromacs_performance_line(20.0),
            gromacs_performance_line(60.0),
        ];
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (_ws, ctx) = gromacs_workspace(&print_lines(&lines));

        let record = run_job(Family::Gromacs.find("PEP").unwrap(), &params(1, 1), &ctx)
            .await
            .unwrap();
        assert_eq!(record.performance, 20.0);
    }

    #[tokio::test]
    async fn test_namd_reports_memory() {
        let ws = Workspace::new();
        ws.add_input("namd/apoa1/apoa1.namd");
        let engine = ws.script(
            ENGINE,
            &print_lines(&[
                "Charm++> Running in SMP mode",
                &namd_benchmark_line(0.123, 1404.54),
                &namd_benchmark_line(0.125, 1406.0),
            ]),
        );
        let ctx = context(harness(&ws, &engine));

        let record = run_job(Family::Namd.find("apoa1").unwrap(), &params(2, 8), &ctx)
            .await
            .unwrap();
        assert_eq!(record.performance, 0.124);
        assert_eq!(record.performance_unit, "days/ns");
        assert_eq!(record.memory_usage, Some(1405.27));
        assert_eq!(record.memory_unit.as_deref(), Some("MB"));
        assert!(record.commandline.contains("+p8 +setcpuaffinity"));
    }

    #[tokio::test]
    async fn test_output_without_marker_lines_is_empty_sample_set() {
        let (_ws, ctx) = gromacs_workspace(&print_lines(&["Fatal error: no GPU found"]));

        let err = run_job(Family::Gromacs.find("MEM").unwrap(), &params(2, 2), &ctx)
            .await
            .unwrap_err();
        match err {
            JobError::Stats { name, source } => {
                assert_eq!(name, "MEM");
                assert!(matches!(source, StatsError::EmptySampleSet { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unparsable_marker_line_discards_the_run() {
        let (_ws, ctx) = gromacs_workspace(&print_lines(&["Performance:  n/a  n/a"]));

        let err = run_job(Family::Gromacs.find("MEM").unwrap(), &params(1, 2), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Stats { .. }));
    }

    #[tokio::test]
    async fn test_nonzero_exit_keeps_metrics() {
        let body = format!("{}\nexit 3", print_lines(&[&gromacs_performance_line(7.5)]));
        let (_ws, ctx) = gromacs_workspace(&body);

        let record = run_job(Family::Gromacs.find("MEM").unwrap(), &params(1, 2), &ctx)
            .await
            .unwrap();
        assert_eq!(record.performance, 7.5);
    }

    #[tokio::test]
    async fn test_missing_engine_is_spawn_failure() {
        let ws = Workspace::new();
        ws.add_input("gromacs/MEM/benchMEM.tpr");
        let ctx = context(harness(&ws, &ws.path().join("bin/not-installed")));

        let err = run_job(Family::Gromacs.find("MEM").unwrap(), &params(3, 2), &ctx)
            .await
            .unwrap_err();
        match err {
            JobError::Runner {
                repetition, source, ..
            } => {
                assert_eq!(repetition, 1);
                assert!(matches!(source, RunnerError::Spawn { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_transient_files_removed_after_each_run() {
        let body = format!(
            ": > md.log\n: > confout.gro\n: > state.cpt\n{}",
            print_lines(&[&gromacs_performance_line(1.0)])
        );
        let (ws, ctx) = gromacs_workspace(&body);

        run_job(Family::Gromacs.find("MEM").unwrap(), &params(2, 2), &ctx)
            .await
            .unwrap();
        for name in ["md.log", "confout.gro", "state.cpt"] {
            assert!(!ws.path().join(name).exists(), "{name} left behind");
        }
    }

    #[tokio::test]
    async fn test_environment_override_replaces_inherited_env() {
        let body = format!(
            "[ \"$BENCH_MARK\" = \"set\" ] || exit 1\n[ -z \"$HOME\" ] || exit 1\n{}",
            print_lines(&[&gromacs_performance_line(3.0)])
        );
        let ws = Workspace::new();
        ws.add_input("gromacs/MEM/benchMEM.tpr");
        let engine = ws.script(ENGINE, &body);
        let mut config = harness(&ws, &engine);
        config.env = Some(BTreeMap::from([("BENCH_MARK".to_string(), "set".to_string())]));
        let ctx = context(config);

        let record = run_job(Family::Gromacs.find("MEM").unwrap(), &params(1, 1), &ctx)
            .await
            .unwrap();
        assert_eq!(record.performance, 3.0);
    }

    #[tokio::test]
    async fn test_output_is_echoed_in_order() {
        let ws = Workspace::new();
        ws.add_input("gromacs/MEM/benchMEM.tpr");
        let engine = ws.script(
            ENGINE,
            &print_lines(&["step 0", "step 100", &gromacs_performance_line(5.0)]),
        );
        let sink = Arc::new(MemorySink::new());
        let ctx = RunContext::new(
            harness(&ws, &engine),
            sink.clone(),
            Arc::new(StaticProbe::new()),
            CancellationToken::new(),
        )
        .silent(true);

        run_job(Family::Gromacs.find("MEM").unwrap(), &params(1, 1), &ctx)
            .await
            .unwrap();
        assert_eq!(
            sink.lines(),
            vec!["step 0".to_string(), "step 100".to_string(), gromacs_performance_line(5.0)]
        );
    }

    #[tokio::test]
    async fn test_gpu_inventory_and_selection_recorded() {
        let ws = Workspace::new();
        ws.add_input("gromacs/MEM/benchMEM.tpr");
        let engine = ws.script(ENGINE, &print_lines(&[&gromacs_performance_line(90.0)]));
        let probe = StaticProbe::new().command(
            "nvidia-smi --query-gpu=name,index --format=csv,noheader",
            "NVIDIA GeForce RTX 4090, 0\n",
        );
        let ctx = RunContext::new(
            harness(&ws, &engine),
            Arc::new(NullSink),
            Arc::new(probe),
            CancellationToken::new(),
        )
        .silent(true);
        let params = RunParams {
            repeats: 1,
            cores: 4,
            gpus: Some("0".parse().unwrap()),
        };

        let record = run_job(Family::Gromacs.find("MEM").unwrap(), &params, &ctx)
            .await
            .unwrap();
        assert_eq!(record.nv_gpus_available, vec!["NVIDIA GeForce RTX 4090", "0"]);
        assert_eq!(record.gpu_index_used.as_deref(), Some("0"));
        assert!(record.commandline.contains("-gpu_id 0"));
    }
}

mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_job_does_not_abort_siblings() {
        let (_ws, ctx) = gromacs_workspace(&print_lines(&[&gromacs_performance_line(1.5)]));

        let report = run_jobs(&names(&["MEM", "NOPE", "PEP"]), Family::Gromacs, &params(1, 2), &ctx).await;

        let ran: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(ran, vec!["MEM", "PEP"]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(&report.failures[0], JobError::UnknownJob { name, .. } if name == "NOPE"));
    }

    #[tokio::test]
    async fn test_timed_out_job_does_not_abort_siblings() {
        let body = format!(
            "case \"$*\" in\n  *benchMEM*) exec sleep 30 ;;\nesac\n{}",
            print_lines(&[&gromacs_performance_line(2.0)])
        );
        let (_ws, mut ctx) = gromacs_workspace(&body);
        ctx.command = CommandConfig {
            timeout: Some(Duration::from_millis(300)),
        };

        let report = run_jobs(&names(&["MEM", "RIB"]), Family::Gromacs, &params(1, 2), &ctx).await;

        assert!(!report.cancelled);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].name, "RIB");
        assert!(matches!(
            &report.failures[0],
            JobError::Runner { source: RunnerError::TimedOut { .. }, .. }
        ));
    }
}

mod sweep_tests {
    use super::*;

    #[tokio::test]
    async fn test_each_configuration_is_persisted_in_caller_order() {
        let (ws, ctx) = gromacs_workspace(&print_lines(&[&gromacs_performance_line(4.0)]));
        let output = ws.output_path();

        let report = sweep(&names(&["MEM", "PEP"]), Family::Gromacs, &[4, 2, 4], 1, None, &ctx, &output).await;

        assert!(report.is_clean());
        let doc = results::load(&output).unwrap();
        let order: Vec<_> = doc
            .results
            .iter()
            .map(|r| (r.name.as_str(), r.num_processes))
            .collect();
        assert_eq!(
            order,
            vec![("MEM", 4), ("PEP", 4), ("MEM", 2), ("PEP", 2), ("MEM", 4), ("PEP", 4)]
        );
        assert_eq!(report.records.len(), 6);
    }

    #[tokio::test]
    async fn test_interrupted_sweep_keeps_completed_configurations() {
        let body = format!(
            "case \"$*\" in\n  *\"-ntomp 8 \"*) : > started-8; exec sleep 30 ;;\nesac\n{}",
            print_lines(&[&gromacs_performance_line(4.0)])
        );
        let (ws, ctx) = gromacs_workspace(&body);
        let output = ws.output_path();

        let cancel = ctx.cancel.clone();
        let marker = ws.path().join("started-8");
        let watcher = tokio::spawn(async move {
            while !marker.exists() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            cancel.cancel();
        });

        let report = sweep(&names(&["MEM"]), Family::Gromacs, &[2, 4, 8], 1, None, &ctx, &output).await;
        watcher.await.unwrap();

        assert!(report.cancelled);
        let cores: Vec<_> = results::load(&output)
            .unwrap()
            .results
            .iter()
            .map(|r| r.num_processes)
            .collect();
        assert_eq!(cores, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_append_grows_existing_document() {
        let (ws, ctx) = gromacs_workspace(&print_lines(&[&gromacs_performance_line(4.0)]));
        let output = ws.output_path();

        sweep(&names(&["MEM", "RIB", "PEP"]), Family::Gromacs, &[1], 1, None, &ctx, &output).await;
        assert_eq!(results::load(&output).unwrap().results.len(), 3);

        sweep(&names(&["RIB"]), Family::Gromacs, &[2, 3], 1, None, &ctx, &output).await;
        let doc = results::load(&output).unwrap();
        assert_eq!(doc.results.len(), 5);
        assert_eq!(doc.results[3].name, "RIB");
        assert_eq!(doc.results[4].num_processes, 3);
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_stop_the_sweep() {
        let (ws, ctx) = gromacs_workspace(&print_lines(&[&gromacs_performance_line(4.0)]));
        let output = ws.path().join("missing-dir/results.json");

        let report = sweep(&names(&["MEM"]), Family::Gromacs, &[1, 2], 1, None, &ctx, &output).await;

        assert_eq!(report.records.len(), 2);
        let unsaved: Vec<_> = report.unpersisted.iter().map(|(cores, _)| *cores).collect();
        assert_eq!(unsaved, vec![1, 2]);
        assert!(!report.is_clean());
    }
}
