//! Destination for exported files.
//!
//! Serializers in this crate never touch the filesystem. Callers hand
//! rendered [`ExportFile`]s to an [`ExportSink`]: the CLI writes them
//! into a directory, tests collect them in a [`MemorySink`].

use hachure_pipeline::PipelineError;

/// MIME type of every SVG document this crate produces.
pub const SVG_MIME: &str = "image/svg+xml";

/// A rendered file ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// File name, without any directory.
    pub name: String,
    /// MIME type of [`contents`](Self::contents).
    pub mime: &'static str,
    /// Document text.
    pub contents: String,
}

impl ExportFile {
    /// An SVG document named `name`.
    #[must_use]
    pub const fn svg(name: String, contents: String) -> Self {
        Self {
            name,
            mime: SVG_MIME,
            contents,
        }
    }
}

/// Errors that can occur while exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The sink failed to store a file.
    #[error("failed to write {name}: {source}")]
    Io {
        /// Name of the file being written.
        name: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The sink cannot accept files at all (e.g. a missing directory or
    /// a disabled download facility).
    #[error("export destination unavailable: {0}")]
    Unavailable(String),

    /// Rendering needed pipeline output that could not be produced.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A batch export found no visible layers.
    #[error("no visible layers to export")]
    NothingVisible,
}

/// Receives rendered files.
pub trait ExportSink {
    /// Store one file.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] or [`ExportError::Unavailable`] when
    /// the file could not be stored.
    fn write_file(&mut self, file: &ExportFile) -> Result<(), ExportError>;
}

/// Sink that keeps every file in memory, in write order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Vec<ExportFile>,
}

impl MemorySink {
    /// An empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Files written so far.
    #[must_use]
    pub fn files(&self) -> &[ExportFile] {
        &self.files
    }

    /// Look up a written file by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExportFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Take ownership of every written file.
    #[must_use]
    pub fn into_files(self) -> Vec<ExportFile> {
        self.files
    }
}

impl ExportSink for MemorySink {
    fn write_file(&mut self, file: &ExportFile) -> Result<(), ExportError> {
        self.files.push(file.clone());
        Ok(())
    }
}
