//! Tree sink that writes a pretty-printed JSON file

use crate::crawler::TreeNode;
use crate::sink::{SinkResult, TreeSink};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

pub struct JsonTreeSink {
    path: PathBuf,
    file: File,
}

impl JsonTreeSink {
    /// Creates (or truncates) the file at `path`
    ///
    /// Opened up front so an unwritable path fails before any crawling.
    pub fn create(path: impl AsRef<Path>) -> SinkResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        tracing::debug!(path = %path.display(), "Opened ATC tree file");
        Ok(Self { path, file })
    }
}

impl TreeSink for JsonTreeSink {
    /// Replaces the file contents with the serialized tree
    fn write_tree(&mut self, tree: &TreeNode) -> SinkResult<()> {
        tracing::info!(path = %self.path.display(), "Save ATC tree to JSON");
        self.file.set_len(0)?;
        self.file.rewind()?;

        let mut writer = BufWriter::new(&mut self.file);
        serde_json::to_writer_pretty(&mut writer, tree)?;
        writer.flush()?;
        Ok(())
    }
}
