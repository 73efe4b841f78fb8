use std::cmp::Ordering;

/// Streaming estimator for one fixed percentile with O(k) memory.
///
/// Keeps a sorted reservoir of at most `k` samples. While the reservoir is
/// filling, the estimate is an exact order statistic of everything seen so
/// far. Once full, a new sample is admitted only if it exceeds the current
/// estimate, and the smallest retained sample is evicted, so the reservoir
/// drifts toward the upper tail of the stream. The bias is intentional:
/// the estimator is built for tail latencies (p90 and up), and low
/// percentiles inherit the same asymmetry.
#[derive(Debug, Clone)]
pub struct QuantileEstimator {
    percentile: f64,
    capacity: usize,
    reservoir: Vec<f64>,
    estimate: f64,
}

impl QuantileEstimator {
    /// `percentile` must lie strictly inside (0, 1); `capacity` ≥ 1.
    /// Both are fixed for the estimator's lifetime.
    pub fn new(percentile: f64, capacity: usize) -> Self {
        debug_assert!(
            percentile > 0.0 && percentile < 1.0,
            "percentile must be inside (0, 1)"
        );
        debug_assert!(capacity >= 1, "reservoir capacity must be at least 1");

        Self {
            percentile,
            capacity,
            // +1: a full reservoir briefly holds the incoming sample too.
            reservoir: Vec::with_capacity(capacity + 1),
            estimate: 0.0,
        }
    }

    /// Feed one sample. Never fails.
    pub fn add(&mut self, value: f64) {
        if self.reservoir.len() < self.capacity {
            self.insert_sorted(value);
        } else if value > self.estimate {
            self.insert_sorted(value);
            // Evict the smallest so the reservoir stays at capacity.
            self.reservoir.remove(0);
        } else {
            // Full reservoir and the sample is at or below the estimate.
            return;
        }

        let index = (self.reservoir.len() as f64 * self.percentile) as usize;
        self.estimate = self.reservoir[index.min(self.reservoir.len() - 1)];
    }

    fn insert_sorted(&mut self, value: f64) {
        self.reservoir.push(value);
        self.reservoir
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    }

    /// Current approximation of the configured percentile.
    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    /// The percentile this estimator tracks, in (0, 1).
    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    /// Display label, `"p90"` style (`"p99.9"` for fractional percentiles).
    pub fn label(&self) -> String {
        let pct = self.percentile * 100.0;
        let rounded = pct.round();
        if (pct - rounded).abs() < 1e-6 {
            format!("p{}", rounded as u32)
        } else {
            let fixed = format!("{pct:.3}");
            format!("p{}", fixed.trim_end_matches('0').trim_end_matches('.'))
        }
    }

    /// Number of samples currently retained.
    pub fn len(&self) -> usize {
        self.reservoir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservoir.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservoir_never_exceeds_capacity() {
        let mut est = QuantileEstimator::new(0.9, 8);
        for i in 0..200 {
            est.add(i as f64);
            assert!(est.len() <= 8);
        }
    }

    #[test]
    fn estimate_is_exact_order_statistic_while_filling() {
        let mut est = QuantileEstimator::new(0.5, 10);
        est.add(5.0);
        assert_eq!(est.estimate(), 5.0);

        // Two samples: index floor(2 * 0.5) = 1 of [1, 5].
        est.add(1.0);
        assert_eq!(est.estimate(), 5.0);

        // Three samples: index floor(3 * 0.5) = 1 of [1, 3, 5].
        est.add(3.0);
        assert_eq!(est.estimate(), 3.0);
    }

    #[test]
    fn median_insert_evict_scenario() {
        let mut est = QuantileEstimator::new(0.5, 3);
        for v in [5.0, 1.0, 3.0] {
            est.add(v);
        }
        assert_eq!(est.estimate(), 3.0);

        // 10 > 3 is admitted; the 1 is evicted; [3, 5, 10] → index 1.
        est.add(10.0);
        assert_eq!(est.len(), 3);
        assert_eq!(est.estimate(), 5.0);
    }

    #[test]
    fn full_reservoir_ignores_values_at_or_below_estimate() {
        let mut est = QuantileEstimator::new(0.5, 3);
        for v in [5.0, 1.0, 3.0] {
            est.add(v);
        }

        est.add(2.0); // below the estimate: dropped
        assert_eq!(est.estimate(), 3.0);
        assert_eq!(est.len(), 3);

        est.add(3.0); // equal to the estimate: also dropped
        assert_eq!(est.estimate(), 3.0);
        assert_eq!(est.len(), 3);
    }

    #[test]
    fn tail_estimate_never_decreases_on_increasing_stream() {
        let mut est = QuantileEstimator::new(0.9, 50);
        let mut previous = 0.0;
        for v in 1..=1000 {
            est.add(v as f64);
            assert!(
                est.estimate() >= previous,
                "estimate regressed at sample {v}"
            );
            previous = est.estimate();
        }
    }

    #[test]
    fn labels_round_cleanly() {
        assert_eq!(QuantileEstimator::new(0.9, 8).label(), "p90");
        assert_eq!(QuantileEstimator::new(0.1, 8).label(), "p10");
        assert_eq!(QuantileEstimator::new(0.999, 8).label(), "p99.9");
    }
}
