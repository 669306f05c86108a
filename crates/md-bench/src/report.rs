//! Summary tables printed to stdout

use crate::catalog::Family;
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use md_bench_common::{InventorySnapshot, SummaryRecord};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.into_iter().map(Cell::new).collect::<Vec<_>>());
    table
}

fn float(value: f64) -> String {
    format!("{value:.4}")
}

/// Field-by-field view of one job's summary record
pub fn summary_table(record: &SummaryRecord) -> Table {
    let mut table = new_table(vec!["Field", "Value"]);
    let gpus = if record.nv_gpus_available.is_empty() {
        "-".to_string()
    } else {
        record.nv_gpus_available.join(", ")
    };

    table.add_row(vec!["name".to_string(), record.name.clone()]);
    table.add_row(vec!["num_processes".to_string(), record.num_processes.to_string()]);
    table.add_row(vec!["nv_gpus_available".to_string(), gpus]);
    table.add_row(vec![
        "gpu_index_used".to_string(),
        record.gpu_index_used.clone().unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["commandline".to_string(), record.commandline.clone()]);
    table.add_row(vec!["min_time".to_string(), float(record.min_time)]);
    table.add_row(vec!["max_time".to_string(), float(record.max_time)]);
    table.add_row(vec!["median_time".to_string(), float(record.median_time)]);
    table.add_row(vec!["standard_deviation".to_string(), float(record.standard_deviation)]);
    table.add_row(vec![
        "performance".to_string(),
        format!("{} {}", float(record.performance), record.performance_unit),
    ]);
    if let Some(memory) = record.memory_usage {
        let unit = record.memory_unit.as_deref().unwrap_or_default();
        table.add_row(vec![
            "memory_usage".to_string(),
            format!("{} {unit}", float(memory)).trim_end().to_string(),
        ]);
    }
    table
}

/// One row per record, in execution order
pub fn results_table(records: &[SummaryRecord]) -> Table {
    let mut table = new_table(vec![
        "Job",
        "Cores",
        "GPUs",
        "Min (s)",
        "Median (s)",
        "Max (s)",
        "Std dev",
        "Performance",
        "Memory",
    ]);

    for record in records {
        let memory = match (record.memory_usage, record.memory_unit.as_deref()) {
            (Some(value), Some(unit)) => format!("{} {unit}", float(value)),
            (Some(value), None) => float(value),
            _ => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(&record.name),
            Cell::new(record.num_processes),
            Cell::new(record.gpu_index_used.as_deref().unwrap_or("-")),
            Cell::new(float(record.min_time)),
            Cell::new(float(record.median_time)),
            Cell::new(float(record.max_time)),
            Cell::new(float(record.standard_deviation)),
            Cell::new(format!("{} {}", float(record.performance), record.performance_unit)),
            Cell::new(memory),
        ]);
    }
    table
}

pub fn specs_table(specs: &InventorySnapshot) -> Table {
    let mut table = new_table(vec!["Component", "Value"]);
    for (name, value) in specs.fields() {
        table.add_row(vec![name, value]);
    }
    table
}

pub fn catalog_table(family: Family) -> Table {
    let mut table = new_table(vec!["Job", "Input", "Steps"]);
    for job in family.jobs() {
        let steps = job
            .steps
            .map(|n| n.to_string())
            .unwrap_or_else(|| "from input".to_string());
        table.add_row(vec![job.name.to_string(), job.input.to_string(), steps]);
    }
    table
}

pub fn print_summary(record: &SummaryRecord) {
    println!("\nResult Summary ({})\n{}", record.name, summary_table(record));
}

pub fn print_results(records: &[SummaryRecord]) {
    if records.is_empty() {
        return;
    }
    println!("\n=== Benchmark Results ===\n{}", results_table(records));
}

pub fn print_specs(specs: &InventorySnapshot) {
    println!("\n=== System ===\n{}", specs_table(specs));
}

pub fn print_catalog(family: Family) {
    println!("Available {family} benchmarks:\n{}", catalog_table(family));
}
