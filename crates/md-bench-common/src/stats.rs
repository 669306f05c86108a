//! Timing statistics utility
//!
//! Provides `TimingStats` for reducing the wall-clock durations of a job's
//! repetitions, and `median` for pooled metric samples.

use thiserror::Error;

/// Statistics requested over a sample set that turned out to be empty
#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("no samples collected for {metric}")]
    EmptySampleSet { metric: String },
}

/// Statistics for the wall-clock durations of all repetitions of one job
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingStats {
    /// Minimum duration in seconds
    pub min: f64,
    /// Maximum duration in seconds
    pub max: f64,
    /// Median duration in seconds
    pub median: f64,
    /// Sample standard deviation in seconds (0.0 for a single repetition)
    pub std_dev: f64,
    /// Number of valid measurements
    pub count: usize,
}

impl TimingStats {
    /// Compute statistics from a slice of durations (in seconds).
    ///
    /// Filters out non-finite values (NaN, infinity) before computing.
    /// The standard deviation is the sample (n - 1) estimator, reported as
    /// exactly zero when only one measurement exists.
    ///
    /// # Example
    /// ```
    /// use md_bench_common::stats::TimingStats;
    ///
    /// let stats = TimingStats::from_durations(&[3.0, 1.0, 2.0]).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 3.0);
    /// assert_eq!(stats.median, 2.0);
    /// assert_eq!(stats.std_dev, 1.0);
    /// ```
    pub fn from_durations(durations: &[f64]) -> Result<Self, StatsError> {
        let valid: Vec<f64> = durations.iter().copied().filter(|x| x.is_finite()).collect();

        let median = median(&valid).ok_or_else(|| StatsError::EmptySampleSet {
            metric: "timing".to_string(),
        })?;

        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            min,
            max,
            median,
            std_dev: sample_std_dev(&valid),
            count: valid.len(),
        })
    }

    /// Copy of these statistics rounded to `places` decimals
    pub fn rounded(&self, places: u32) -> Self {
        Self {
            min: round_to(self.min, places),
            max: round_to(self.max, places),
            median: round_to(self.median, places),
            std_dev: round_to(self.std_dev, places),
            count: self.count,
        }
    }
}

/// Median of a sample set; the mean of the two middle values for even sizes.
///
/// Returns `None` for an empty slice instead of producing NaN.
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median of a named metric's pooled samples, failing loudly when empty
pub fn metric_median(metric: &str, samples: &[f64]) -> Result<f64, StatsError> {
    median(samples).ok_or_else(|| StatsError::EmptySampleSet {
        metric: metric.to_string(),
    })
}

/// Sample standard deviation; zero when fewer than two samples exist
fn sample_std_dev(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }

    let mean = samples.iter().sum::<f64>() / n as f64;
    let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
