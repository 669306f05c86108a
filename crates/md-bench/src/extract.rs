//! Metric extraction from captured engine output

use crate::error::ExtractError;
use md_bench_common::ExtractionRule;

/// Read one float from every line starting with the rule's prefix.
///
/// Values come back in line order, one per matching line; an engine may
/// print its marker line several times and every occurrence counts. A
/// matching line whose field is missing or not a number is an error rather
/// than a dropped sample, since silently losing samples would skew medians.
pub fn extract(text: &str, rule: &ExtractionRule) -> Result<Vec<f64>, ExtractError> {
    text.lines()
        .filter(|line| rule.matches(line))
        .map(|line| parse_field(line, rule.field))
        .collect()
}

fn parse_field(line: &str, field: usize) -> Result<f64, ExtractError> {
    let token = line
        .split_whitespace()
        .nth(field)
        .ok_or_else(|| ExtractError {
            line: line.to_string(),
            field,
            reason: "line has too few fields".to_string(),
        })?;

    token.parse::<f64>().map_err(|e| ExtractError {
        line: line.to_string(),
        field,
        reason: format!("'{token}' is not a number ({e})"),
    })
}
