//! Linux inventory via `lsb_release`, `lscpu`, `lspci`, procfs and DMI sysfs

use super::probe::{ProbeRunner, probe_command};
use super::table::{ParseRule, Table};
use super::{InventoryCollector, or_not_available};
use crate::error::ProbeError;
use md_bench_common::InventorySnapshot;
use std::path::Path;
use std::sync::Arc;

const COLON: ParseRule = ParseRule::KeyValue { separator: ":" };
const COLON_SPACE: ParseRule = ParseRule::KeyValue { separator: ": " };
const EQUALS: ParseRule = ParseRule::KeyValue { separator: "=" };

const OS_RELEASE: &str = "/etc/os-release";
const MEMINFO: &str = "/proc/meminfo";
const DMI_DIR: &str = "/sys/devices/virtual/dmi/id";

/// lspci classes that describe a display adapter
const GPU_CLASSES: &[&str] = &["VGA compatible controller", "3D controller"];

const KB_PER_GB: u64 = 1024 * 1024;

/// Collector for Linux hosts
pub struct LinuxInventory {
    probe: Arc<dyn ProbeRunner>,
}

impl LinuxInventory {
    pub fn new(probe: Arc<dyn ProbeRunner>) -> Self {
        Self { probe }
    }

    fn command_table(&self, program: &str, args: &[&str], rule: ParseRule) -> Result<Table, ProbeError> {
        let stdout = self.probe.run(program, args)?;
        Table::parse_non_empty(&probe_command(program, args), &stdout, rule)
    }

    fn file_table(&self, path: &str, rule: ParseRule) -> Result<Table, ProbeError> {
        let contents = self.probe.read(Path::new(path))?;
        Table::parse_non_empty(path, &contents, rule)
    }

    fn dmi(&self, name: &str) -> Result<String, ProbeError> {
        let path = Path::new(DMI_DIR).join(name);
        let value = self.probe.read(&path)?.trim().to_string();
        if value.is_empty() {
            return Err(ProbeError::EmptyOutput {
                command: path.display().to_string(),
            });
        }
        Ok(value)
    }

    fn os(&self) -> Result<String, ProbeError> {
        let lsb = self
            .command_table("lsb_release", &["-d"], COLON)
            .and_then(|t| t.first()?.require("Description").map(str::to_string));

        // Minimal images ship without lsb_release
        lsb.or_else(|_| {
            let table = self.file_table(OS_RELEASE, EQUALS)?;
            let pretty = table.first()?.require("PRETTY_NAME")?;
            Ok(pretty.trim_matches('"').to_string())
        })
    }

    fn cpu(&self) -> Result<String, ProbeError> {
        let table = self.command_table("lscpu", &[], COLON)?;
        Ok(table.first()?.require("Model name")?.to_string())
    }

    fn ram(&self) -> Result<String, ProbeError> {
        let table = self.file_table(MEMINFO, COLON)?;
        let total = table.first()?.require("MemTotal")?;
        let kb: u64 = total
            .split_whitespace()
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ProbeError::Unparsable {
                command: MEMINFO.to_string(),
                field: "MemTotal".to_string(),
                value: total.to_string(),
            })?;
        Ok(format!("{} GB (Non-Reserved)", kb / KB_PER_GB))
    }

    fn gpu(&self) -> Result<String, ProbeError> {
        let table = self.command_table("lspci", &[], COLON_SPACE)?;
        let record = table.first()?;
        let adapters: Vec<&str> = GPU_CLASSES
            .iter()
            .flat_map(|class| record.matching(class))
            .collect();

        if adapters.is_empty() {
            return Err(ProbeError::MissingField {
                command: "lspci".to_string(),
                field: GPU_CLASSES.join(" / "),
            });
        }
        Ok(adapters.join(" / "))
    }

    fn motherboard(&self) -> Result<String, ProbeError> {
        Ok(format!(
            "{} {} ({})",
            self.dmi("board_vendor")?,
            self.dmi("board_name")?,
            self.dmi("board_version")?
        ))
    }

    fn system(&self) -> Result<String, ProbeError> {
        Ok(format!(
            "{} {}",
            self.dmi("sys_vendor")?,
            self.dmi("product_name")?
        ))
    }
}

impl InventoryCollector for LinuxInventory {
    fn name(&self) -> &'static str {
        "linux"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysinfo::probe::StaticProbe;
    use md_bench_common::defaults::NOT_AVAILABLE;

    fn dmi(name: &str) -> String {
        format!("{DMI_DIR}/{name}")
    }

    fn full_probe() -> StaticProbe {
        StaticProbe::new()
            .command("lsb_release -d", "Description:\tUbuntu 22.04.4 LTS\n")
            .command(
                "lscpu",
                "Architecture:            x86_64\nCPU(s):                  32\nModel name:              AMD Ryzen 9 7950X 16-Core Processor\n",
            )
            .command(
                "lspci",
                "00:00.0 Host bridge: Advanced Micro Devices, Inc. [AMD] Device 14d8\n01:00.0 VGA compatible controller: NVIDIA Corporation AD102 [GeForce RTX 4090] (rev a1)\n",
            )
            .file(MEMINFO, "MemTotal:       65536000 kB\nMemFree:        1234 kB\n")
            .file(dmi("board_vendor"), "ASUSTeK COMPUTER INC.\n")
            .file(dmi("board_name"), "ROG STRIX X670E-E GAMING WIFI\n")
            .file(dmi("board_version"), "Rev 1.xx\n")
            .file(dmi("sys_vendor"), "ASUS\n")
            .file(dmi("product_name"), "System Product Name\n")
    }

    #[test]
    fn test_full_collection() {
        let snapshot = LinuxInventory::new(Arc::new(full_probe())).collect();

        assert_eq!(snapshot.os, "Ubuntu 22.04.4 LTS");
        assert_eq!(snapshot.cpu, "AMD Ryzen 9 7950X 16-Core Processor");
        assert_eq!(snapshot.ram, "62 GB (Non-Reserved)");
        assert_eq!(
            snapshot.gpu,
            "NVIDIA Corporation AD102 [GeForce RTX 4090] (rev a1)"
        );
        assert_eq!(
            snapshot.mb,
            "ASUSTeK COMPUTER INC. ROG STRIX X670E-E GAMING WIFI (Rev 1.xx)"
        );
        assert_eq!(snapshot.system, "ASUS System Product Name");
    }

    #[test]
    fn test_os_release_fallback() {
        let probe = StaticProbe::new().file(
            OS_RELEASE,
            "NAME=\"Rocky Linux\"\nPRETTY_NAME=\"Rocky Linux 9.3 (Blue Onyx)\"\n",
        );
        let inventory = LinuxInventory::new(Arc::new(probe));
        assert_eq!(inventory.os().unwrap(), "Rocky Linux 9.3 (Blue Onyx)");
    }

    #[test]
    fn test_each_failure_is_isolated() {
        let probe = StaticProbe::new()
            .command("lscpu", "Model name: Intel(R) Xeon(R) Gold 6338 CPU @ 2.00GHz\n")
            .file(MEMINFO, "MemTotal: 263842176 kB\n");
        let snapshot = LinuxInventory::new(Arc::new(probe)).collect();

        assert_eq!(snapshot.cpu, "Intel(R) Xeon(R) Gold 6338 CPU @ 2.00GHz");
        assert_eq!(snapshot.ram, "251 GB (Non-Reserved)");
        assert_eq!(snapshot.os, NOT_AVAILABLE);
        assert_eq!(snapshot.gpu, NOT_AVAILABLE);
        assert_eq!(snapshot.mb, NOT_AVAILABLE);
        assert_eq!(snapshot.system, NOT_AVAILABLE);
    }

    #[test]
    fn test_headless_host_has_no_gpu() {
        let probe = StaticProbe::new().command(
            "lspci",
            "00:00.0 Host bridge: Intel Corporation 440FX - 82441FX PMC [Natoma] (rev 02)\n",
        );
        let inventory = LinuxInventory::new(Arc::new(probe));
        assert!(matches!(
            inventory.gpu(),
            Err(ProbeError::MissingField { .. })
        ));
    }
}
