//! SQLite sinks
//!
//! Both sinks replace the previous run's rows when they open, the drug sink
//! truncating `drugs` and the tree sink truncating `atc_tree`.

use crate::crawler::TreeNode;
use crate::extract::DrugRecord;
use crate::sink::schema::{initialize_schema, INSERT_DRUG, INSERT_TREE};
use crate::sink::{log_scanned, RecordSink, SinkResult, TreeSink};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use tokio::sync::mpsc;

/// Opens a file database with the sink PRAGMAs; schema setup is left to the sink
fn open_database(path: &Path) -> SinkResult<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
    ",
    )?;
    Ok(conn)
}

/// Inserts drug records in transactions of `batch_size` rows
///
/// A batch that fails is rolled back and the error returned; batches
/// committed before it stay in the table.
pub struct SqliteSink {
    conn: Connection,
    batch_size: usize,
}

impl SqliteSink {
    /// Opens the database at `path` and clears the `drugs` table
    pub fn open(path: &Path, batch_size: usize) -> SinkResult<Self> {
        tracing::info!(path = %path.display(), batch_size, "Writing drugs to SQLite");
        Self::from_connection(open_database(path)?, batch_size)
    }

    /// Uses an existing connection, creating the schema if needed
    pub fn from_connection(conn: Connection, batch_size: usize) -> SinkResult<Self> {
        initialize_schema(&conn)?;
        let removed = conn.execute("DELETE FROM drugs", [])?;
        tracing::debug!(removed, "Truncated drugs table");
        Ok(Self {
            conn,
            batch_size: batch_size.max(1),
        })
    }

    /// Rows currently stored in `drugs`
    pub fn stored(&self) -> SinkResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM drugs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn commit_batch(&mut self, batch: &[DrugRecord]) -> SinkResult<()> {
        let scanned_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(INSERT_DRUG)?;
            for record in batch {
                stmt.execute(params![
                    record.name,
                    record.link,
                    record.dosage,
                    record.manufacturer,
                    record.inn,
                    record.pharm_group,
                    record.registration,
                    record.atc_code,
                    record.instruction,
                    scanned_at,
                ])?;
            }
        }
        // Dropping an uncommitted transaction rolls it back
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl RecordSink for SqliteSink {
    async fn accept(&mut self, mut records: mpsc::Receiver<DrugRecord>) -> SinkResult<u64> {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut committed = 0u64;
        let mut received = 0u64;

        loop {
            let record = records.recv().await;
            let done = record.is_none();
            if let Some(record) = record {
                batch.push(record);
                received += 1;
                log_scanned(received);
            }

            if batch.len() >= self.batch_size || (done && !batch.is_empty()) {
                if let Err(e) = self.commit_batch(&batch) {
                    tracing::error!(committed, batch = batch.len(), error = %e, "Batch rolled back");
                    return Err(e);
                }
                committed += batch.len() as u64;
                tracing::debug!(committed, "Batch committed");
                batch.clear();
            }

            if done {
                break;
            }
        }

        tracing::info!(total = committed, "Scanned {} drugs", committed);
        Ok(committed)
    }
}

/// Stores the tree as one JSON document in `atc_tree`
pub struct SqliteTreeSink {
    conn: Connection,
}

impl SqliteTreeSink {
    pub fn open(path: &Path) -> SinkResult<Self> {
        Self::from_connection(open_database(path)?)
    }

    pub fn from_connection(conn: Connection) -> SinkResult<Self> {
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl TreeSink for SqliteTreeSink {
    fn write_tree(&mut self, tree: &TreeNode) -> SinkResult<()> {
        tracing::info!("Save ATC tree to SQLite");
        let document = serde_json::to_string_pretty(tree)?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM atc_tree", [])?;
        tx.execute(
            INSERT_TREE,
            params![document, tree.node_count() as i64, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }
}
