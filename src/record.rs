use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::quantile::QuantileEstimator;

// ─── Public types ────────────────────────────────────────────────

/// One raw sample kept for the recent-history feed.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    /// Elapsed time in seconds.
    pub value: f64,
    /// Wall-clock time the sample was recorded at.
    pub timestamp: DateTime<Utc>,
}

/// Read-only copy of one key's statistics, safe to hand to observers.
/// Serializes straight into whatever feed the observer ships it on.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSnapshot {
    pub key: String,
    /// The last observed elapsed time (seconds).
    pub most_recent: f64,
    /// Arithmetic mean over every observation.
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: u64,
    pub last_updated: DateTime<Utc>,
    /// Percentile label (`"p90"`) → current estimate.
    pub percentiles: BTreeMap<String, f64>,
    /// Recent raw samples, oldest first, bounded by the configured capacity.
    pub timeline: Vec<TimelineEntry>,
}

// ─── Internal state ──────────────────────────────────────────────

/// Full statistical summary for one measurement key.
///
/// Owned exclusively by the registry; the outside world only ever sees
/// [`RecordSnapshot`] copies.
pub(crate) struct Record {
    most_recent: f64,
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
    last_updated: DateTime<Utc>,
    estimators: Vec<QuantileEstimator>,
    timeline: VecDeque<TimelineEntry>,
    timeline_capacity: usize,
}

impl Record {
    /// A record only exists together with its first sample, so `count ≥ 1`
    /// holds for its whole lifetime.
    pub(crate) fn new(first: f64, config: &Config) -> Self {
        let mut estimators: Vec<QuantileEstimator> = config
            .percentiles
            .iter()
            .map(|&p| QuantileEstimator::new(p, config.reservoir_capacity))
            .collect();
        for est in &mut estimators {
            est.add(first);
        }

        let now = Utc::now();
        let mut timeline = VecDeque::with_capacity(config.timeline_capacity + 1);
        timeline.push_back(TimelineEntry {
            value: first,
            timestamp: now,
        });

        Self {
            most_recent: first,
            sum: first,
            count: 1,
            min: first,
            max: first,
            last_updated: now,
            estimators,
            timeline,
            timeline_capacity: config.timeline_capacity,
        }
    }

    /// Fold one observation into every aggregate.
    pub(crate) fn add(&mut self, seconds: f64) {
        self.most_recent = seconds;
        self.sum += seconds;
        self.count += 1;
        if seconds < self.min {
            self.min = seconds;
        }
        if seconds > self.max {
            self.max = seconds;
        }
        for est in &mut self.estimators {
            est.add(seconds);
        }

        let now = Utc::now();
        self.last_updated = now;
        self.timeline.push_back(TimelineEntry {
            value: seconds,
            timestamp: now,
        });
        if self.timeline.len() > self.timeline_capacity {
            self.timeline.pop_front();
        }
    }

    fn average(&self) -> f64 {
        if self.count == 0 {
            // Construction guarantees count ≥ 1; report loudly instead of
            // propagating NaN if that invariant is ever broken.
            tracing::error!("latency record has no samples");
            return 0.0;
        }
        self.sum / self.count as f64
    }

    pub(crate) fn snapshot(&self, key: &str) -> RecordSnapshot {
        RecordSnapshot {
            key: key.to_owned(),
            most_recent: self.most_recent,
            average: self.average(),
            min: self.min,
            max: self.max,
            count: self.count,
            last_updated: self.last_updated,
            percentiles: self
                .estimators
                .iter()
                .map(|est| (est.label(), est.estimate()))
                .collect(),
            timeline: self.timeline.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn first_sample_seeds_every_field() {
        let record = Record::new(0.25, &Config::default());
        let snap = record.snapshot("first");

        assert_eq!(snap.count, 1);
        assert_eq!(snap.min, 0.25);
        assert_eq!(snap.max, 0.25);
        assert_eq!(snap.average, 0.25);
        assert_eq!(snap.most_recent, 0.25);
        assert_eq!(snap.timeline.len(), 1);
        assert_eq!(snap.percentiles.len(), Config::default().percentiles.len());
        for estimate in snap.percentiles.values() {
            assert_eq!(*estimate, 0.25);
        }
    }

    #[test]
    fn aggregates_match_reference_computation() {
        let samples = [0.004, 0.010, 0.002, 0.030, 0.007];
        let mut record = Record::new(samples[0], &Config::default());
        for &s in &samples[1..] {
            record.add(s);
        }

        let snap = record.snapshot("db.query");
        assert_eq!(snap.count, 5);
        assert_eq!(snap.min, 0.002);
        assert_eq!(snap.max, 0.030);
        assert_eq!(snap.most_recent, 0.007);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((snap.average - mean).abs() < 1e-12);
    }

    #[test]
    fn aggregates_are_order_independent() {
        // Deterministic shuffle, same seed every run.
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut samples: Vec<f64> = (1..=100).map(|i| i as f64 / 1000.0).collect();
        samples.shuffle(&mut rng);

        let mut record = Record::new(samples[0], &Config::default());
        for &s in &samples[1..] {
            record.add(s);
        }

        let snap = record.snapshot("shuffled");
        assert_eq!(snap.count, 100);
        assert_eq!(snap.min, 0.001);
        assert_eq!(snap.max, 0.100);
        assert!((snap.average - 0.0505).abs() < 1e-12);
    }

    #[test]
    fn timeline_evicts_oldest_first() {
        let config = Config {
            timeline_capacity: 4,
            ..Config::default()
        };
        let mut record = Record::new(0.0, &config);
        for i in 1..=6 {
            record.add(i as f64);
        }

        let snap = record.snapshot("k");
        assert_eq!(snap.timeline.len(), 4);
        let values: Vec<f64> = snap.timeline.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![3.0, 4.0, 5.0, 6.0]);
    }
}
