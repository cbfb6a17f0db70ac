//! Bounded worker pool over a stream
//!
//! A stage pulls items from one channel, applies a fallible transform that
//! yields zero or more outputs per item, and pushes each output onto its own
//! channel. Failed items are logged and dropped. The output channel closes
//! exactly once, after every worker has finished.

use crate::crawler::progress::StageProgress;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// Creates a stream that yields `items` and is already closed
///
/// Used to seed the first stage of a pipeline.
pub fn one_shot<T>(items: Vec<T>) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(items.len().max(1));
    for item in items {
        // Capacity covers every item, so this never fails
        let _ = tx.try_send(item);
    }
    rx
}

/// Runs a transform over a stream with a fixed number of workers
#[derive(Debug)]
pub struct StageRunner {
    name: Arc<str>,
    workers: usize,
    capacity: usize,
    progress: Arc<StageProgress>,
}

impl StageRunner {
    /// Creates a stage with `workers` concurrent tasks (at least one)
    pub fn new(name: impl Into<String>, workers: usize) -> Self {
        let name: String = name.into();
        Self {
            progress: Arc::new(StageProgress::new(name.clone())),
            name: name.into(),
            workers: workers.max(1),
            capacity: 1,
        }
    }

    /// Sets the output stream capacity (at least one)
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Reports into externally owned counters instead of private ones
    pub fn with_progress(mut self, progress: Arc<StageProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> Arc<StageProgress> {
        Arc::clone(&self.progress)
    }

    /// Starts the workers and returns the output stream
    ///
    /// The returned receiver yields outputs in completion order and ends
    /// once the input is exhausted and all in-flight work has settled.
    /// Must be called within a Tokio runtime.
    pub fn run<T, U, E, F, Fut>(self, input: mpsc::Receiver<T>, transform: F) -> mpsc::Receiver<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<U>, E>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.capacity);
        let input = Arc::new(Mutex::new(input));
        let transform = Arc::new(transform);

        tracing::debug!(stage = %self.name, workers = self.workers, "Starting stage");

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            workers.spawn(worker_loop(
                Arc::clone(&self.name),
                worker_id,
                Arc::clone(&input),
                tx.clone(),
                Arc::clone(&transform),
                Arc::clone(&self.progress),
            ));
        }

        let name = self.name;
        let progress = self.progress;
        tokio::spawn(async move {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(stage = %name, error = %e, "Stage worker aborted");
                }
            }

            let snap = progress.snapshot();
            tracing::info!(
                stage = %name,
                processed = snap.processed,
                failed = snap.failed,
                emitted = snap.emitted,
                "Stage finished"
            );
            progress.mark_finished();

            // Last sender: the output stream closes here
            drop(tx);
        });

        rx
    }
}

async fn worker_loop<T, U, E, F, Fut>(
    stage: Arc<str>,
    worker_id: usize,
    input: Arc<Mutex<mpsc::Receiver<T>>>,
    output: mpsc::Sender<U>,
    transform: Arc<F>,
    progress: Arc<StageProgress>,
) where
    E: fmt::Display,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<Vec<U>, E>>,
{
    loop {
        let item = {
            let mut rx = input.lock().await;
            rx.recv().await
        };
        let Some(item) = item else {
            break;
        };

        match transform(item).await {
            Ok(outputs) => {
                progress.record_processed();
                for out in outputs {
                    if output.send(out).await.is_err() {
                        tracing::debug!(stage = %stage, worker_id, "Output closed, worker stopping");
                        return;
                    }
                    progress.record_emitted();
                }
            }
            Err(e) => {
                progress.record_failed();
                tracing::warn!(stage = %stage, worker_id, error = %e, "Item dropped");
            }
        }
    }

    tracing::trace!(stage = %stage, worker_id, "Input exhausted, worker done");
}
