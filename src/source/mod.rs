//! Import sources: where JL files come from and how they are claimed.
//!
//! Every backend follows the same lifecycle: `list` the candidates, `claim`
//! one (an exclusive rename or copy-then-delete), `read` its lines, and
//! `complete` it by moving it to its processed name. A file whose processing
//! fails is never completed and stays under its claim name for inspection.

mod local;
pub mod naming;
mod object_store;
mod s3;

pub use local::LocalDirSource;
pub use object_store::{MemoryObjectStore, ObjectStore, ObjectStoreSource};
pub use s3::S3ObjectStore;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

#[derive(Debug, Error)]
pub enum SourceError {
    /// Another worker or process claimed the item first. Not a failure.
    #[error("Item already claimed by another worker: {0}")]
    AlreadyClaimed(String),
    #[error("Not a JL item: {0}")]
    NotJl(String),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Object store error during {op}: {message}")]
    ObjectStore { op: &'static str, message: String },
}

impl SourceError {
    pub(crate) fn io(path: impl fmt::Display, source: std::io::Error) -> Self {
        SourceError::Io {
            path: path.to_string(),
            source,
        }
    }

    pub(crate) fn object_store(op: &'static str, e: impl fmt::Display) -> Self {
        SourceError::ObjectStore {
            op,
            message: e.to_string(),
        }
    }
}

/// A candidate JL item: a file path or an object key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceItem {
    pub id: String,
}

impl SourceItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for SourceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// An item this worker holds exclusively. Move semantics: consumed by
/// [`ImportSource::complete`] or [`ClaimedItem::abandon`].
///
/// Dropping it unconsumed logs a warning; the item stays claimed either way.
#[derive(Debug)]
pub struct ClaimedItem {
    pub item: SourceItem,
    /// Claim-marked path or key the item now lives under.
    pub claim_id: String,
    consumed: bool,
}

impl ClaimedItem {
    pub(crate) fn new(item: SourceItem, claim_id: impl Into<String>) -> Self {
        Self {
            item,
            claim_id: claim_id.into(),
            consumed: false,
        }
    }

    /// Mark this handle as consumed, returning the original item and the
    /// claim id.
    pub(crate) fn consume(mut self) -> (SourceItem, String) {
        self.consumed = true;
        (
            std::mem::take(&mut self.item),
            std::mem::take(&mut self.claim_id),
        )
    }

    /// Give up on the item without completing it. It keeps its claim name.
    pub fn abandon(self) {
        let (item, claim_id) = self.consume();
        tracing::warn!(item = %item, claim = %claim_id, "Leaving item in claimed state");
    }
}

impl Drop for ClaimedItem {
    fn drop(&mut self) {
        if !self.consumed {
            tracing::warn!(
                claim = %self.claim_id,
                "ClaimedItem dropped without being completed or abandoned"
            );
        }
    }
}

/// Forward-only reader over the lines of a claimed item.
///
/// When the item was downloaded to a scratch file, the reader owns it and the
/// file is deleted when the reader is dropped.
pub struct LineReader {
    lines: Lines<BufReader<File>>,
    origin: String,
    _scratch: Option<NamedTempFile>,
}

impl LineReader {
    /// Open a local file for reading.
    pub async fn open(path: PathBuf) -> Result<Self, SourceError> {
        let file = File::open(&path)
            .await
            .map_err(|e| SourceError::io(path.display(), e))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            origin: path.display().to_string(),
            _scratch: None,
        })
    }

    /// Read from a scratch file, deleting it when the reader goes away.
    pub async fn from_scratch(scratch: NamedTempFile) -> Result<Self, SourceError> {
        let mut reader = Self::open(scratch.path().to_path_buf()).await?;
        reader._scratch = Some(scratch);
        Ok(reader)
    }

    /// Next line, or `None` at end of input. Invalid UTF-8 is an I/O error.
    pub async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        self.lines
            .next_line()
            .await
            .map_err(|e| SourceError::io(&self.origin, e))
    }
}

/// A backend that yields JL items and implements the claim protocol.
#[async_trait]
pub trait ImportSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Candidate items: names ending in `.jl` that are neither processed nor
    /// claimed.
    async fn list(&self) -> Result<Vec<SourceItem>, SourceError>;

    /// Claim an item exclusively.
    ///
    /// Returns `SourceError::AlreadyClaimed` if another actor got there
    /// first.
    async fn claim(&self, item: &SourceItem) -> Result<ClaimedItem, SourceError>;

    /// Open the claimed item's lines.
    async fn read(&self, claimed: &ClaimedItem) -> Result<LineReader, SourceError>;

    /// Move the claimed item to its processed name.
    async fn complete(&self, claimed: ClaimedItem) -> Result<(), SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn scratch_file_is_removed_with_reader() {
        let mut scratch = NamedTempFile::new().unwrap();
        writeln!(scratch, "{{\"a\":1}}").unwrap();
        writeln!(scratch, "{{\"a\":2}}").unwrap();
        let path = scratch.path().to_path_buf();

        let mut reader = LineReader::from_scratch(scratch).await.unwrap();
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(path.exists());
        drop(reader);

        assert!(!path.exists());
    }

    #[test]
    fn abandon_consumes_handle() {
        let claimed = ClaimedItem::new(SourceItem::new("foo.jl"), "foo.processing");
        let (item, claim) = claimed.consume();
        assert_eq!(item.id, "foo.jl");
        assert_eq!(claim, "foo.processing");
    }
}
