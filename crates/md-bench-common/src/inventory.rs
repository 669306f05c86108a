//! Normalized host inventory snapshot
//!
//! Collected once at startup and embedded verbatim under `specs` in the
//! result document.

use crate::defaults::NOT_AVAILABLE;
use serde::{Deserialize, Serialize};

/// Human-readable description of the host machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Operating system name and build
    pub os: String,
    /// CPU model
    pub cpu: String,
    /// Motherboard vendor, product and firmware version
    pub mb: String,
    /// Installed memory (size, layout, speed where known)
    pub ram: String,
    /// GPU model and driver
    pub gpu: String,
    /// Chassis / system vendor and model
    pub system: String,
    /// Engine executable the benchmark family runs
    pub engine: String,
}

impl Default for InventorySnapshot {
    fn default() -> Self {
        Self {
            os: NOT_AVAILABLE.to_string(),
            cpu: NOT_AVAILABLE.to_string(),
            mb: NOT_AVAILABLE.to_string(),
            ram: NOT_AVAILABLE.to_string(),
            gpu: NOT_AVAILABLE.to_string(),
            system: NOT_AVAILABLE.to_string(),
            engine: NOT_AVAILABLE.to_string(),
        }
    }
}

impl InventorySnapshot {
    /// Copy of this snapshot with the engine field set
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Field name / value pairs in document order
    pub fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("os", &self.os),
            ("cpu", &self.cpu),
            ("mb", &self.mb),
            ("ram", &self.ram),
            ("gpu", &self.gpu),
            ("system", &self.system),
            ("engine", &self.engine),
        ]
    }
}
