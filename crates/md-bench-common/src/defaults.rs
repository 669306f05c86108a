//! Default configuration values shared across md-bench components

/// Default number of repetitions per job
pub const DEFAULT_REPEATS: u32 = 3;

/// Default result document path
pub const DEFAULT_OUTPUT: &str = "results.json";

/// Default per-run timeout in seconds (2 hours)
pub const DEFAULT_RUN_TIMEOUT: u64 = 7200;

/// Sentinel written in place of an inventory field whose probe failed
pub const NOT_AVAILABLE: &str = "N/A";

/// Decimal places kept for persisted timings
pub const TIME_PRECISION: u32 = 4;

/// Decimal places kept for persisted throughput
pub const PERFORMANCE_PRECISION: u32 = 5;

/// Decimal places kept for persisted memory usage
pub const MEMORY_PRECISION: u32 = 4;

/// Returns the default run timeout
pub fn default_run_timeout() -> u64 {
    DEFAULT_RUN_TIMEOUT
}
