use thiserror::Error;

// ─── Defaults ────────────────────────────────────────────────────

/// Percentiles tracked per key unless configured otherwise.
pub const DEFAULT_PERCENTILES: [f64; 5] = [0.90, 0.70, 0.50, 0.30, 0.10];

/// Samples kept per quantile estimator.
const DEFAULT_RESERVOIR_CAPACITY: usize = 50;

/// Raw samples kept per key for the recent-history feed.
const DEFAULT_TIMELINE_CAPACITY: usize = 500;

// ─── Config ──────────────────────────────────────────────────────

/// Tuning knobs for a [`Registry`](crate::Registry).
///
/// Fixed at construction; validated once by the registry constructor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reservoir size of every quantile estimator.
    pub reservoir_capacity: usize,
    /// Percentiles tracked per key, each strictly inside (0, 1).
    pub percentiles: Vec<f64>,
    /// How many raw `(value, timestamp)` entries each key retains.
    pub timeline_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reservoir_capacity: DEFAULT_RESERVOIR_CAPACITY,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            timeline_capacity: DEFAULT_TIMELINE_CAPACITY,
        }
    }
}

impl Config {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.percentiles.is_empty() {
            return Err(ConfigError::NoPercentiles);
        }
        for &p in &self.percentiles {
            // The negated form also rejects NaN.
            if !(p > 0.0 && p < 1.0) {
                return Err(ConfigError::PercentileOutOfRange(p));
            }
        }
        if self.reservoir_capacity == 0 {
            return Err(ConfigError::ZeroReservoirCapacity);
        }
        if self.timeline_capacity == 0 {
            return Err(ConfigError::ZeroTimelineCapacity);
        }
        Ok(())
    }
}

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("percentile {0} is outside the open interval (0, 1)")]
    PercentileOutOfRange(f64),

    #[error("at least one percentile is required")]
    NoPercentiles,

    #[error("reservoir capacity must be at least 1")]
    ZeroReservoirCapacity,

    #[error("timeline capacity must be at least 1")]
    ZeroTimelineCapacity,
}
