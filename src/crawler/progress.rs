//! Run-scoped progress counters
//!
//! Every stage registers a [`StageProgress`] with the run's [`RunProgress`]
//! and bumps its counters as items flow through. Observers poll snapshots;
//! nothing in the control flow depends on them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Counters for a single pipeline stage
#[derive(Debug)]
pub struct StageProgress {
    name: String,
    processed: AtomicU64,
    failed: AtomicU64,
    emitted: AtomicU64,
    finished: AtomicBool,
}

/// Point-in-time copy of a stage's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSnapshot {
    /// Inputs transformed successfully
    pub processed: u64,
    /// Inputs dropped because the transform failed
    pub failed: u64,
    /// Outputs delivered to the next stage
    pub emitted: u64,
    /// Whether the output stream has been closed
    pub finished: bool,
}

impl StageSnapshot {
    /// Inputs consumed so far, successful or not
    pub fn consumed(&self) -> u64 {
        self.processed + self.failed
    }
}

impl StageProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            emitted: AtomicU64::new(0),
            finished: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_emitted(&self) {
        self.record_emitted_n(1);
    }

    pub(crate) fn record_emitted_n(&self, n: u64) {
        self.emitted.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            finished: self.finished.load(Ordering::Acquire),
        }
    }
}

/// Progress registry for one pipeline run
#[derive(Debug)]
pub struct RunProgress {
    started: Instant,
    stages: Mutex<Vec<Arc<StageProgress>>>,
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl RunProgress {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            stages: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new stage and returns its counters
    pub fn register(&self, name: impl Into<String>) -> Arc<StageProgress> {
        let stage = Arc::new(StageProgress::new(name));
        self.stages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::clone(&stage));
        stage
    }

    /// Snapshots of all registered stages, in registration order
    pub fn snapshot(&self) -> Vec<(String, StageSnapshot)> {
        self.stages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|stage| (stage.name().to_string(), stage.snapshot()))
            .collect()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Logs one line per stage
    pub fn log(&self) {
        for (name, snap) in self.snapshot() {
            tracing::info!(
                stage = %name,
                processed = snap.processed,
                failed = snap.failed,
                emitted = snap.emitted,
                finished = snap.finished,
                "Stage progress"
            );
        }
    }
}

/// Spawns a task that logs run progress every `interval`
///
/// The task runs until aborted; the caller owns the handle.
pub fn spawn_progress_reporter(progress: Arc<RunProgress>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            tracing::info!(elapsed = ?progress.elapsed(), "Progress report");
            progress.log();
        }
    })
}
