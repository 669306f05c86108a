//! Summary record persisted once per (job, core count) pair

use serde::{Deserialize, Serialize};

/// The reduced result of all repetitions of one job at one core count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Job name from the family catalog
    pub name: String,
    /// Thread / core count handed to the engine
    pub num_processes: u32,
    /// Flat name/index token list reported by nvidia-smi at collection time
    pub nv_gpus_available: Vec<String>,
    /// GPU ids requested for the run, if any
    pub gpu_index_used: Option<String>,
    /// Exact command line executed
    pub commandline: String,
    pub min_time: f64,
    pub max_time: f64,
    pub median_time: f64,
    /// Sample standard deviation of the timings (0 for a single repetition)
    pub standard_deviation: f64,
    /// Median throughput pooled over all repetitions
    pub performance: f64,
    pub performance_unit: String,
    /// Median memory usage pooled over all repetitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_unit: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SummaryRecord {
        SummaryRecord {
            name: "MEM".to_string(),
            num_processes: 8,
            nv_gpus_available: vec![],
            gpu_index_used: None,
            commandline: "gmx mdrun -ntomp 8".to_string(),
            min_time: 1.0,
            max_time: 2.0,
            median_time: 1.5,
            standard_deviation: 0.5,
            performance: 12.35,
            performance_unit: "ns/day".to_string(),
            memory_usage: None,
            memory_unit: None,
        }
    }

    #[test]
    fn test_memory_fields_omitted_when_absent() {
        let json = serde_json::to_string(&record()).unwrap();
        assert!(!json.contains("memory_usage"));
        assert!(json.contains("\"gpu_index_used\":null"));
        assert!(json.contains("\"performance_unit\":\"ns/day\""));
    }

    #[test]
    fn test_memory_fields_written_when_present() {
        let mut r = record();
        r.memory_usage = Some(1404.54);
        r.memory_unit = Some("MB".to_string());

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["memory_usage"], 1404.54);
        assert_eq!(json["memory_unit"], "MB");

        let parsed: SummaryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, r);
    }
}
