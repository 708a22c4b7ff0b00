//! Progress reporting for in-flight network operations.
//!
//! [`supervise`] runs one network operation as its own task and observes it
//! from the caller: between checks for the worker's result it wakes on a
//! fixed cadence and calls a tick handler. The handler emits a liveness
//! heartbeat for listing fetches, or a [`ProgressSnapshot`] for transfers.
//!
//! The cadence timer belongs to the observer and is dropped as soon as the
//! worker's result arrives, so no reporter outlives its operation. The
//! observer never times the worker out; stalled connections are bounded only
//! by the HTTP client's transport timeouts.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, trace};

use super::error::MirrorError;

/// Sink for heartbeats and progress snapshots.
pub trait ProgressReporter: Send + Sync {
    /// A listing fetch for `url` is still in flight.
    fn heartbeat(&self, url: &str);

    /// A transfer has made progress.
    fn progress(&self, snapshot: &ProgressSnapshot);
}

/// Writes heartbeats and snapshots through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn heartbeat(&self, url: &str) {
        trace!(url = %url, "waiting for listing page");
    }

    fn progress(&self, snapshot: &ProgressSnapshot) {
        info!(
            url = %snapshot.url,
            bytes = snapshot.bytes_on_disk,
            total = ?snapshot.total,
            percent = ?snapshot.percent().map(|p| (p * 10.0).round() / 10.0),
            bytes_per_sec = snapshot.bytes_per_sec.round(),
            "transfer progress"
        );
    }
}

/// Drives a terminal spinner.
#[derive(Debug)]
pub struct SpinnerReporter {
    bar: ProgressBar,
}

impl Default for SpinnerReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpinnerReporter {
    /// Creates the spinner; it is drawn on stderr.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar }
    }

    /// Clears the spinner from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for SpinnerReporter {
    fn heartbeat(&self, url: &str) {
        self.bar.set_message(format!("listing {url}"));
        self.bar.tick();
    }

    fn progress(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_message(snapshot.to_string());
        self.bar.tick();
    }
}

/// Point-in-time view of a transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// The file being transferred.
    pub url: String,
    /// Bytes on disk: resume offset plus bytes written this attempt.
    pub bytes_on_disk: u64,
    /// Full remote length, when known.
    pub total: Option<u64>,
    /// Throughput since the previous snapshot.
    pub bytes_per_sec: f64,
}

impl ProgressSnapshot {
    /// Percentage complete, when the total length is known and non-zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        self.total
            .filter(|total| *total > 0)
            .map(|total| self.bytes_on_disk as f64 * 100.0 / total as f64)
    }
}

impl fmt::Display for ProgressSnapshot {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.url, HumanBytes(self.bytes_on_disk))?;
        if let Some(percent) = self.percent() {
            write!(f, " ({percent:.1}%)")?;
        }
        write!(f, " at {}/s", HumanBytes(self.bytes_per_sec.max(0.0) as u64))
    }
}

/// Byte counters shared between a transfer worker and its observer.
#[derive(Debug, Default)]
pub struct TransferProgress {
    offset: AtomicU64,
    written: AtomicU64,
    total: OnceLock<u64>,
}

impl TransferProgress {
    /// Creates counters for a new attempt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where on disk this attempt starts writing.
    pub fn set_offset(&self, offset: u64) {
        self.offset.store(offset, Ordering::Relaxed);
    }

    /// Records the full remote length; later calls are ignored.
    pub fn set_total(&self, total: u64) {
        let _ = self.total.set(total);
    }

    /// Adds freshly written bytes.
    pub fn add(&self, bytes: u64) {
        self.written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Bytes written during this attempt.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Bytes on disk: offset plus bytes written.
    #[must_use]
    pub fn on_disk(&self) -> u64 {
        self.offset.load(Ordering::Relaxed) + self.written()
    }

    /// Full remote length, when known.
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total.get().copied()
    }
}

/// Turns shared counters into snapshots with instantaneous throughput.
#[derive(Debug)]
pub struct SnapshotSampler {
    url: String,
    progress: Arc<TransferProgress>,
    last_bytes: u64,
    last_at: Instant,
}

impl SnapshotSampler {
    /// Starts sampling `progress` now.
    #[must_use]
    pub fn new(url: impl Into<String>, progress: Arc<TransferProgress>) -> Self {
        let last_bytes = progress.on_disk();
        Self {
            url: url.into(),
            progress,
            last_bytes,
            last_at: Instant::now(),
        }
    }

    /// Takes a snapshot and resets the throughput window.
    #[allow(clippy::cast_precision_loss)]
    pub fn sample(&mut self) -> ProgressSnapshot {
        let now = Instant::now();
        let bytes = self.progress.on_disk();
        let elapsed = now.duration_since(self.last_at).as_secs_f64();
        let delta = bytes.saturating_sub(self.last_bytes) as f64;
        let bytes_per_sec = if elapsed > 0.0 { delta / elapsed } else { 0.0 };

        self.last_bytes = bytes;
        self.last_at = now;

        ProgressSnapshot {
            url: self.url.clone(),
            bytes_on_disk: bytes,
            total: self.progress.total(),
            bytes_per_sec,
        }
    }
}

/// Runs `worker` as its own task and calls `on_tick` every `every` until it finishes.
///
/// The first tick happens one full interval after start; a worker that finishes
/// sooner produces no ticks at all.
///
/// # Errors
///
/// Returns [`MirrorError::Worker`] if the worker task panicked.
pub async fn supervise<T, F>(
    url: &str,
    worker: F,
    every: Duration,
    mut on_tick: impl FnMut(),
) -> Result<T, MirrorError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let every = every.max(Duration::from_millis(1));
    let mut handle = tokio::spawn(worker);
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            joined = &mut handle => {
                return joined.map_err(|e| MirrorError::worker(url, e));
            }
            _ = ticker.tick() => on_tick(),
        }
    }
}
