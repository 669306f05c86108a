//! md-bench-common - Shared types and utilities
//!
//! This crate provides the value types that flow between the harness layers
//! and end up in the persisted result document. It has no process or async
//! dependencies so it stays cheap to depend on.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`document`]: Result document and its static metadata block
//! - [`inventory`]: Normalized host inventory snapshot
//! - [`metric`]: Metric extraction rules keyed by output line prefix
//! - [`record`]: Per-job summary record
//! - [`stats`]: Timing statistics (min/max/median/stdev) and medians

pub mod defaults;
pub mod document;
pub mod inventory;
pub mod metric;
pub mod record;
pub mod stats;

// Re-export commonly used types
pub use document::{Metadata, ResultDocument};
pub use inventory::InventorySnapshot;
pub use metric::{ExtractionRule, MetricKind, MetricRule};
pub use record::SummaryRecord;
pub use stats::{StatsError, TimingStats};
