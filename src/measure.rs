use std::future::Future;
use std::panic::Location;
use std::path::Path;
use std::time::Instant;

use crate::registry::Registry;

// ─── Stopwatch guard ─────────────────────────────────────────────

/// Records elapsed wall time into the registry exactly once, on drop.
///
/// Dropping is the cleanup path: the observation lands whether the measured
/// code returns, errors, or panics. `Instant` is monotonic, so wall-clock
/// adjustments never produce bogus durations.
#[must_use = "a stopwatch records when dropped; binding it to _ discards the measurement scope"]
pub struct Stopwatch<'a> {
    registry: &'a Registry,
    key: String,
    start: Instant,
}

impl<'a> Stopwatch<'a> {
    fn new(registry: &'a Registry, key: String) -> Self {
        Self {
            registry,
            key,
            start: Instant::now(),
        }
    }

    /// The key this stopwatch will record under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stop now instead of at end of scope.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Stopwatch<'_> {
    fn drop(&mut self) {
        self.registry
            .record_observation(&self.key, self.start.elapsed().as_secs_f64());
    }
}

// ─── Timed invocation ────────────────────────────────────────────

impl Registry {
    /// Time `work` under a key derived from the calling site and return its
    /// output unchanged.
    ///
    /// The elapsed time is recorded exactly once, after `work` finishes.
    /// An `Err` return or a panic still records the time spent up to the
    /// failure, and the failure itself reaches the caller unaltered.
    #[track_caller]
    pub fn measure<T>(&self, work: impl FnOnce() -> T) -> T {
        let key = site_key(Location::caller());
        self.measure_with(key, work)
    }

    /// Time `work` under an explicit key. Same guarantees as [`measure`].
    ///
    /// [`measure`]: Registry::measure
    pub fn measure_named<T>(&self, key: impl Into<String>, work: impl FnOnce() -> T) -> T {
        self.measure_with(key.into(), work)
    }

    fn measure_with<T>(&self, key: String, work: impl FnOnce() -> T) -> T {
        let _stopwatch = Stopwatch::new(self, key);
        work()
    }

    /// Time a future under a key derived from the calling site.
    ///
    /// The clock starts at the first poll and the observation is recorded
    /// when the future completes. A future dropped early records the
    /// elapsed time up to the drop.
    #[track_caller]
    pub fn measure_future<'a, F>(&'a self, work: F) -> impl Future<Output = F::Output> + 'a
    where
        F: Future + 'a,
    {
        let key = site_key(Location::caller());
        async move {
            let _stopwatch = Stopwatch::new(self, key);
            work.await
        }
    }

    /// Time a future under an explicit key. Same semantics as
    /// [`measure_future`](Registry::measure_future).
    pub fn measure_future_named<'a, F>(
        &'a self,
        key: impl Into<String>,
        work: F,
    ) -> impl Future<Output = F::Output> + 'a
    where
        F: Future + 'a,
    {
        let key = key.into();
        async move {
            let _stopwatch = Stopwatch::new(self, key);
            work.await
        }
    }

    /// Start a stopwatch for `key`; it records when dropped or stopped.
    /// For measured regions that don't fit inside a single closure.
    pub fn start(&self, key: impl Into<String>) -> Stopwatch<'_> {
        Stopwatch::new(self, key.into())
    }

    /// Start a stopwatch keyed by the calling site.
    #[track_caller]
    pub fn start_here(&self) -> Stopwatch<'_> {
        Stopwatch::new(self, site_key(Location::caller()))
    }
}

// ─── Call-site keys ──────────────────────────────────────────────

/// Derive a measurement key from a source location: file stem plus line,
/// `"users [42]"` style. `Location` carries no function name, so file and
/// line are what identify the site; the derived-key space is bounded by the
/// number of measured call sites in the program.
fn site_key(location: &'static Location<'static>) -> String {
    let file = Path::new(location.file())
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(location.file());
    format!("{} [{}]", file, location.line())
}
