//! Sinks: the single consumers at the end of a run
//!
//! A [`RecordSink`] drains the drug record stream and reports how many
//! records it durably wrote. A [`TreeSink`] stores the finished ATC tree
//! in one piece.

mod csv_file;
mod json_file;
mod schema;
mod sqlite;

pub use csv_file::CsvSink;
pub use json_file::JsonTreeSink;
pub use schema::initialize_schema;
pub use sqlite::{SqliteSink, SqliteTreeSink};

use crate::crawler::TreeNode;
use crate::extract::DrugRecord;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Records between "scanned N drugs" progress lines
pub(crate) const PROGRESS_EVERY: u64 = 100;

/// Errors raised while writing results; all of them are fatal for the run
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Consumes a record stream until it ends
///
/// Returning early (on error) drops the receiver, which stops the upstream
/// workers at their next send.
#[async_trait]
pub trait RecordSink: Send {
    /// Writes every record and returns the number durably stored
    async fn accept(&mut self, records: mpsc::Receiver<DrugRecord>) -> SinkResult<u64>;
}

/// Stores a completed tree
pub trait TreeSink: Send {
    fn write_tree(&mut self, tree: &TreeNode) -> SinkResult<()>;
}

pub(crate) fn log_scanned(count: u64) {
    if count > 0 && count % PROGRESS_EVERY == 0 {
        tracing::info!(count, "scanned {} drugs", count);
    }
}
