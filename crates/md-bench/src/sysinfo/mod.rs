//! Host inventory collection
//!
//! One [`InventoryCollector`] per OS family, chosen once at startup. All
//! OS-specific query syntax lives in the variant modules; nothing else in the
//! crate branches on the host OS.

pub mod linux;
pub mod probe;
pub mod table;
pub mod windows;

pub use linux::LinuxInventory;
pub use probe::{ProbeRunner, StaticProbe, SystemProbe};
pub use windows::WindowsInventory;

use crate::error::{InventoryError, ProbeError};
use md_bench_common::InventorySnapshot;
use md_bench_common::defaults::NOT_AVAILABLE;
use std::sync::Arc;
use tracing::{debug, warn};

/// Collects a normalized description of the host
pub trait InventoryCollector: Send + Sync {
    /// OS family this collector queries
    fn name(&self) -> &'static str;

    /// Run every query; a failed query degrades only its own field
    fn collect(&self) -> InventorySnapshot;
}

/// Select the collector for an OS name as reported by `std::env::consts::OS`.
///
/// Fails before running any probe when the OS has no collector.
pub fn collector_for(
    os: &str,
    probe: Arc<dyn ProbeRunner>,
) -> Result<Box<dyn InventoryCollector>, InventoryError> {
    match os {
        "linux" => Ok(Box::new(LinuxInventory::new(probe))),
        "windows" => Ok(Box::new(WindowsInventory::new(probe))),
        other => Err(InventoryError::UnsupportedOs(other.to_string())),
    }
}

/// Collector for the host this process runs on
pub fn host_collector() -> Result<Box<dyn InventoryCollector>, InventoryError> {
    collector_for(std::env::consts::OS, Arc::new(SystemProbe))
}

/// Unwrap a field query, logging and substituting the sentinel on failure
pub(crate) fn or_not_available(field: &str, result: Result<String, ProbeError>) -> String {
    match result {
        Ok(value) => {
            debug!(field, value = %value, "Collected inventory field");
            value
        }
        Err(e) => {
            warn!(field, error = %e, "Inventory query failed");
            NOT_AVAILABLE.to_string()
        }
    }
}
