//! Windows inventory via `wmic ... /format:csv`

use super::probe::{ProbeRunner, probe_command};
use super::table::{ParseRule, Table};
use super::{InventoryCollector, or_not_available};
use crate::error::ProbeError;
use md_bench_common::InventorySnapshot;
use std::sync::Arc;

const WMIC: &str = "wmic";

const OS_QUERY: &[&str] = &["os", "get", "caption,buildnumber", "/format:csv"];
const CPU_QUERY: &[&str] = &["cpu", "get", "name", "/format:csv"];
const BOARD_QUERY: &[&str] = &["baseboard", "get", "product,manufacturer", "/format:csv"];
const BIOS_QUERY: &[&str] = &["bios", "get", "SMBIOSBIOSVersion", "/format:csv"];
const RAM_QUERY: &[&str] = &["memorychip", "get", "Capacity,Speed", "/format:csv"];
const GPU_QUERY: &[&str] = &[
    "path",
    "win32_VideoController",
    "get",
    "name,driverversion",
    "/format:csv",
];
const SYSTEM_QUERY: &[&str] = &["computersystem", "get", "manufacturer,model", "/format:csv"];

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Collector for Windows hosts
pub struct WindowsInventory {
    probe: Arc<dyn ProbeRunner>,
}

impl WindowsInventory {
    pub fn new(probe: Arc<dyn ProbeRunner>) -> Self {
        Self { probe }
    }

    fn query(&self, args: &[&str]) -> Result<Table, ProbeError> {
        let stdout = self.probe.run(WMIC, args)?;
        Table::parse_non_empty(&probe_command(WMIC, args), &stdout, ParseRule::Csv)
    }

    fn os(&self) -> Result<String, ProbeError> {
        let table = self.query(OS_QUERY)?;
        let os = table.first()?;
        Ok(format!(
            "{} ({})",
            os.require("Caption")?,
            os.require("BuildNumber")?
        ))
    }

    fn cpu(&self) -> Result<String, ProbeError> {
        let table = self.query(CPU_QUERY)?;
        Ok(table.first()?.require("Name")?.to_string())
    }

    fn motherboard(&self) -> Result<String, ProbeError> {
        let board_table = self.query(BOARD_QUERY)?;
        let board = board_table.first()?;
        let name = format!(
            "{} {}",
            board.require("Manufacturer")?,
            board.require("Product")?
        );

        // Firmware version is a nice-to-have on top of the board identity
        let bios = self
            .query(BIOS_QUERY)
            .and_then(|t| t.first()?.require("SMBIOSBIOSVersion").map(str::to_string));
        match bios {
            Ok(version) => Ok(format!("{name} ({version})")),
            Err(_) => Ok(name),
        }
    }

    fn ram(&self) -> Result<String, ProbeError> {
        let table = self.query(RAM_QUERY)?;
        summarize_ram(&table)
    }

    fn gpu(&self) -> Result<String, ProbeError> {
        let table = self.query(GPU_QUERY)?;
        let adapters = table
            .records()
            .map(|r| Ok(format!("{} ({})", r.require("Name")?, r.require("DriverVersion")?)))
            .collect::<Result<Vec<_>, ProbeError>>()?;
        Ok(adapters.join(" / "))
    }

    fn system(&self) -> Result<String, ProbeError> {
        let table = self.query(SYSTEM_QUERY)?;
        let system = table.first()?;
        Ok(format!(
            "{} ({})",
            system.require("Manufacturer")?,
            system.require("Model")?
        ))
    }
}

impl InventoryCollector for WindowsInventory {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn collect(&self) -> InventorySnapshot {
        InventorySnapshot {
            os: or_not_available("os", self.os()),
            cpu: or_not_available("cpu", self.cpu()),
            mb: or_not_available("mb", self.motherboard()),
            ram: or_not_available("ram", self.ram()),
            gpu: or_not_available("gpu", self.gpu()),
            system: or_not_available("system", self.system()),
            ..InventorySnapshot::default()
        }
    }
}

/// Total installed memory from one row per stick.
///
/// Identical sticks were collapsed by the table, so each distinct row
/// contributes `capacity x count`.
fn summarize_ram(table: &Table) -> Result<String, ProbeError> {
    let mut total_gb = 0;
    let mut layout = Vec::new();
    let mut speed = None;

    for stick in table.records() {
        let capacity = stick.require("Capacity")?;
        let bytes: u64 = capacity.parse().map_err(|_| ProbeError::Unparsable {
            command: table.source().to_string(),
            field: "Capacity".to_string(),
            value: capacity.to_string(),
        })?;
        let stick_gb = bytes / BYTES_PER_GB;
        let count = stick.count() as u64;

        total_gb += stick_gb * count;
        layout.push(format!("{count}x{stick_gb}GB"));
        if speed.is_none() {
            speed = stick.get("Speed").filter(|s| !s.is_empty());
        }
    }

    if layout.is_empty() {
        return Err(ProbeError::EmptyOutput {
            command: table.source().to_string(),
        });
    }

    let mut summary = format!("{total_gb}GB ({})", layout.join(" + "));
    if let Some(speed) = speed {
        summary.push_str(&format!(" {speed}MHz"));
    }
    Ok(summary)
}
