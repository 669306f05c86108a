//! md-bench - benchmark harness for molecular-dynamics engines
//!
//! Runs GROMACS and NAMD jobs as subprocesses, extracts throughput from their
//! output, reduces repetitions to summary statistics and appends them to a
//! JSON result document together with a snapshot of the host.

pub mod benchmark;
pub mod catalog;
pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod gpu;
pub mod logging;
pub mod report;
pub mod results;
pub mod sweep;
pub mod sysinfo;
