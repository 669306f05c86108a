//! Metric extraction rules
//!
//! Engines report throughput on marker lines whose layout is not under our
//! control. Each rule pins the marker prefix and the whitespace-split field
//! that carries the number, so the coupling to the tool's output format is
//! named in exactly one place.

use serde::{Deserialize, Serialize};

/// Which summary field a metric feeds
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    /// Simulation throughput
    Performance,
    /// Resident memory reported by the engine
    MemoryUsage,
}

/// A line-prefix literal plus the zero-indexed field to read as a float
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRule {
    /// Literal the line must start with
    pub prefix: &'static str,
    /// Index into the whitespace-split line
    pub field: usize,
}

impl ExtractionRule {
    pub const fn new(prefix: &'static str, field: usize) -> Self {
        Self { prefix, field }
    }

    /// Whether a captured output line is a marker line for this rule
    pub fn matches(&self, line: &str) -> bool {
        line.starts_with(self.prefix)
    }
}

/// An extraction rule bound to the summary field and unit it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricRule {
    pub kind: MetricKind,
    pub rule: ExtractionRule,
    pub unit: &'static str,
}

/// GROMACS `Performance:` line; field 1 is ns/day.
///
/// ```text
/// Performance:       48.211        0.498
/// ```
pub const GROMACS_NS_PER_DAY: MetricRule = MetricRule {
    kind: MetricKind::Performance,
    rule: ExtractionRule::new("Performance:", 1),
    unit: "ns/day",
};

/// NAMD benchmark line; field 7 is days/ns.
///
/// ```text
/// Info: Benchmark time: 8 CPUs 0.0213 s/step 0.123 days/ns 1404.54 MB memory
/// ```
pub const NAMD_DAYS_PER_NS: MetricRule = MetricRule {
    kind: MetricKind::Performance,
    rule: ExtractionRule::new("Info: Benchmark", 7),
    unit: "days/ns",
};

/// NAMD benchmark line; field 9 is memory in MB.
pub const NAMD_MEMORY_MB: MetricRule = MetricRule {
    kind: MetricKind::MemoryUsage,
    rule: ExtractionRule::new("Info: Benchmark", 9),
    unit: "MB",
};

#[cfg(test)]
mod tests {
    use super::*;

    const GROMACS_LINE: &str = "Performance:       48.211        0.498";
    const NAMD_LINE: &str =
        "Info: Benchmark time: 8 CPUs 0.0213 s/step 0.123 days/ns 1404.54 MB memory";

    fn field<'a>(line: &'a str, rule: &ExtractionRule) -> &'a str {
        line.split_whitespace().nth(rule.field).unwrap()
    }

    #[test]
    fn test_gromacs_field_index_pinned() {
        assert!(GROMACS_NS_PER_DAY.rule.matches(GROMACS_LINE));
        assert_eq!(field(GROMACS_LINE, &GROMACS_NS_PER_DAY.rule), "48.211");
    }

    #[test]
    fn test_namd_field_indices_pinned() {
        assert!(NAMD_DAYS_PER_NS.rule.matches(NAMD_LINE));
        assert_eq!(field(NAMD_LINE, &NAMD_DAYS_PER_NS.rule), "0.123");
        assert_eq!(field(NAMD_LINE, &NAMD_MEMORY_MB.rule), "1404.54");
    }

    #[test]
    fn test_prefix_must_lead_the_line() {
        assert!(!GROMACS_NS_PER_DAY.rule.matches("  Performance: 1.0"));
        assert!(!NAMD_DAYS_PER_NS.rule.matches("Info: Startup"));
    }

    #[test]
    fn test_metric_kind_display() {
        assert_eq!(MetricKind::Performance.to_string(), "performance");
        assert_eq!(MetricKind::MemoryUsage.as_ref(), "memory_usage");
    }
}
