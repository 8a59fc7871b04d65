//! Where a table's Arrow data lives.

use std::path::{Path, PathBuf};

/// A file of Arrow record batches written by the host.
///
/// The host may still be writing the file. Until it finishes, the IPC
/// footer with the schema and batch offsets is absent and readers must
/// rely on offsets reported out of band.
pub trait DataSource {
    /// Absolute path of the Arrow file.
    fn absolute_path(&self) -> &Path;

    /// Whether the IPC footer has been written.
    fn is_footer_written(&self) -> bool;

    /// Whether the Arrow schema carries the real column names.
    fn has_column_names(&self) -> bool;
}

/// Whether the schema must be taken from the trailing IPC footer.
///
/// Only a finished file has a footer to read. An unfinished file is read
/// from its leading schema message instead.
pub fn schema_footer_required(source: &dyn DataSource) -> bool {
    source.is_footer_written()
}

/// A data source backed by a path on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
    footer_written: bool,
    column_names: bool,
}

impl FileSource {
    /// A complete file whose schema carries column names.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            footer_written: true,
            column_names: true,
        }
    }

    pub fn with_footer_written(mut self, written: bool) -> Self {
        self.footer_written = written;
        self
    }

    pub fn with_column_names(mut self, present: bool) -> Self {
        self.column_names = present;
        self
    }
}

impl DataSource for FileSource {
    fn absolute_path(&self) -> &Path {
        &self.path
    }

    fn is_footer_written(&self) -> bool {
        self.footer_written
    }

    fn has_column_names(&self) -> bool {
        self.column_names
    }
}
