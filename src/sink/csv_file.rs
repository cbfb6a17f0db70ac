//! CSV record sink

use crate::extract::DrugRecord;
use crate::sink::{log_scanned, RecordSink, SinkError, SinkResult};
use async_trait::async_trait;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tokio::sync::mpsc;

const HEADER: [&str; 8] = [
    "Name",
    "Link",
    "Dosage",
    "Manufacture",
    "INN",
    "PharmGroup",
    "Registration",
    "ATCCode",
];

/// Writes one CSV row per record; the instruction text is not exported
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    /// Creates (or truncates) the file at `path` and writes the header
    pub fn create(path: &Path) -> SinkResult<Self> {
        let file = File::create(path)?;
        tracing::info!(path = %path.display(), "Writing drugs to CSV");
        Self::from_writer(file)
    }
}

impl<W: Write + Send> CsvSink<W> {
    pub fn from_writer(inner: W) -> SinkResult<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(HEADER)?;
        Ok(Self { writer })
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> SinkResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }

    fn write(&mut self, record: &DrugRecord) -> SinkResult<()> {
        self.writer.write_record([
            &record.name,
            &record.link,
            &record.dosage,
            &record.manufacturer,
            &record.inn,
            &record.pharm_group,
            &record.registration,
            &record.atc_code,
        ])?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for CsvSink<W> {
    async fn accept(&mut self, mut records: mpsc::Receiver<DrugRecord>) -> SinkResult<u64> {
        let mut count = 0u64;
        while let Some(record) = records.recv().await {
            self.write(&record)?;
            count += 1;
            log_scanned(count);
        }
        self.writer.flush()?;

        tracing::info!(total = count, "Scanned {} drugs", count);
        Ok(count)
    }
}
