//! Scoped latency measurement with streaming percentile estimation.
//!
//! An embeddable engine for ad-hoc instrumentation: call sites push elapsed
//! times in under a stable key (explicit, or derived from the call site),
//! and each key accumulates min/max/mean, a bounded recent-sample timeline,
//! and bounded-memory percentile estimates. Observers pull ordered
//! snapshots and listen on a coalescing update channel instead of polling
//! the hot path.
//!
//! ```
//! use timescope::{Registry, SnapshotOrder};
//!
//! let registry = Registry::new();
//!
//! let total = registry.measure_named("sum", || (0..1000).sum::<u64>());
//! assert_eq!(total, 499500);
//!
//! let snapshot = registry.snapshot(SnapshotOrder::MostRecentlyUpdated);
//! assert_eq!(snapshot[0].key, "sum");
//! assert_eq!(snapshot[0].count, 1);
//! ```

mod config;
mod measure;
mod quantile;
mod record;
mod registry;

pub use config::{Config, ConfigError, DEFAULT_PERCENTILES};
pub use measure::Stopwatch;
pub use quantile::QuantileEstimator;
pub use record::{RecordSnapshot, TimelineEntry};
pub use registry::{Registry, SnapshotOrder};
