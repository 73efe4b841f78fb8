use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::config::{Config, ConfigError};
use crate::record::{Record, RecordSnapshot};

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe measurement directory.
///
/// Call sites push observations in with [`record_observation`] (or the
/// timing helpers layered on top of it); observers pull ordered
/// [`RecordSnapshot`]s out and listen on the update channel. Records are
/// created on first sight of a key and retained for the registry's
/// lifetime; there is no eviction, so callers are responsible for keeping
/// key cardinality bounded (derived call-site keys are; free-form dynamic
/// strings are not).
///
/// [`record_observation`]: Registry::record_observation
pub struct Registry {
    config: Config,
    /// Key map under a read-write lock; each record behind its own mutex.
    records: RwLock<HashMap<String, Arc<Mutex<Record>>>>,
    update_tx: watch::Sender<u64>,
}

/// Sort criterion for [`Registry::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotOrder {
    /// Freshest record first, what a live display wants.
    #[default]
    MostRecentlyUpdated,
    KeyAscending,
    SlowestAverage,
    SlowestMax,
}

// ─── Registry impl ───────────────────────────────────────────────

impl Registry {
    /// Registry with default tuning (50-sample reservoirs, p90/p70/p50/p30/p10,
    /// 500-entry timelines).
    pub fn new() -> Self {
        Self::with_config(Config::default()).expect("default config is valid")
    }

    /// Registry with explicit tuning. Fails if the config is invalid.
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let (update_tx, _) = watch::channel(0);
        Ok(Self {
            config,
            records: RwLock::new(HashMap::new()),
            update_tx,
        })
    }

    /// Record one observation for `key`, creating its record on first sight.
    ///
    /// `seconds` is elapsed wall time; negative or non-finite values are
    /// clamped to zero with a warning rather than corrupting min/max.
    /// Never fails.
    pub fn record_observation(&self, key: &str, seconds: f64) {
        debug_assert!(!key.is_empty(), "measurement key must be non-empty");
        let seconds = sanitize(key, seconds);
        self.update_record(key, seconds);

        // Published after every lock is released, so a subscriber woken by
        // this update may re-enter snapshot() freely.
        self.update_tx.send_modify(|version| *version += 1);
    }

    fn update_record(&self, key: &str, seconds: f64) {
        // Fast path: existing key, shared map lock only.
        {
            let records = self.records.read();
            if let Some(record) = records.get(key) {
                record.lock().add(seconds);
                return;
            }
        }

        let mut records = self.records.write();
        // Double-check: another thread may have created the record between
        // the read and write locks.
        match records.get(key) {
            Some(record) => record.lock().add(seconds),
            None => {
                debug!(key, "creating measurement record");
                records.insert(
                    key.to_owned(),
                    Arc::new(Mutex::new(Record::new(seconds, &self.config))),
                );
            }
        }
    }

    /// Read-only copy of every record, sorted by `order`.
    ///
    /// Safe to call concurrently with `record_observation`; each record is
    /// locked only long enough to copy it.
    pub fn snapshot(&self, order: SnapshotOrder) -> Vec<RecordSnapshot> {
        let records = self.records.read();
        let mut out: Vec<RecordSnapshot> = records
            .iter()
            .map(|(key, record)| record.lock().snapshot(key))
            .collect();
        drop(records);

        match order {
            SnapshotOrder::MostRecentlyUpdated => {
                out.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
            }
            SnapshotOrder::KeyAscending => out.sort_by(|a, b| a.key.cmp(&b.key)),
            SnapshotOrder::SlowestAverage => out.sort_by(|a, b| {
                b.average
                    .partial_cmp(&a.average)
                    .unwrap_or(Ordering::Equal)
            }),
            SnapshotOrder::SlowestMax => {
                out.sort_by(|a, b| b.max.partial_cmp(&a.max).unwrap_or(Ordering::Equal));
            }
        }
        out
    }

    /// JSON rendition of [`snapshot`](Self::snapshot), ready for an
    /// observer to ship on whatever feed it serves.
    pub fn snapshot_json(&self, order: SnapshotOrder) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot(order))
    }

    /// Single-key readout.
    pub fn get(&self, key: &str) -> Option<RecordSnapshot> {
        let records = self.records.read();
        records.get(key).map(|record| record.lock().snapshot(key))
    }

    /// Number of distinct keys observed so far. Useful for watching key
    /// cardinality in long-running processes.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Level-triggered update signal.
    ///
    /// The value is a version counter bumped on every observation; rapid
    /// updates coalesce, and observers re-read [`snapshot`](Self::snapshot)
    /// rather than receiving a payload. Any number of subscribers is fine,
    /// and a slow subscriber never blocks a measurement call site.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.update_tx.subscribe()
    }

    /// The same signal as [`subscribe`](Self::subscribe), as a `Stream` for
    /// async observers.
    pub fn updates(&self) -> WatchStream<u64> {
        WatchStream::new(self.update_tx.subscribe())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

fn sanitize(key: &str, seconds: f64) -> f64 {
    if seconds.is_finite() && seconds >= 0.0 {
        return seconds;
    }
    warn!(key, seconds, "clamping invalid duration to zero");
    0.0
}
