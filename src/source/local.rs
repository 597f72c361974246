//! Local directory source.
//!
//! Claiming is a single `rename`, which is atomic within one filesystem: of
//! two processes renaming the same file, exactly one succeeds and the other
//! sees the source gone.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::naming::{is_candidate, local_claim_path, local_processed_path};
use super::{ClaimedItem, ImportSource, LineReader, SourceError, SourceItem};

/// JL files in a single directory (not recursive).
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    folder: PathBuf,
}

impl LocalDirSource {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

#[async_trait]
impl ImportSource for LocalDirSource {
    fn describe(&self) -> String {
        format!("local:{}", self.folder.display())
    }

    async fn list(&self) -> Result<Vec<SourceItem>, SourceError> {
        let mut entries = tokio::fs::read_dir(&self.folder)
            .await
            .map_err(|e| SourceError::io(self.folder.display(), e))?;

        let mut items = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SourceError::io(self.folder.display(), e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_candidate(name) {
                continue;
            }
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file {
                items.push(SourceItem::new(entry.path().display().to_string()));
            }
        }

        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn claim(&self, item: &SourceItem) -> Result<ClaimedItem, SourceError> {
        let path = PathBuf::from(&item.id);
        let claim_path =
            local_claim_path(&path).ok_or_else(|| SourceError::NotJl(item.id.clone()))?;

        match tokio::fs::rename(&path, &claim_path).await {
            Ok(()) => {
                info!(file = %item, claim = %claim_path.display(), "Claimed file");
                Ok(ClaimedItem::new(
                    item.clone(),
                    claim_path.display().to_string(),
                ))
            }
            // The source is gone: another worker renamed it first.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %item, "File vanished before rename");
                Err(SourceError::AlreadyClaimed(item.id.clone()))
            }
            Err(e) => {
                warn!(file = %item, error = %e, "Could not rename file for processing");
                Err(SourceError::io(&item.id, e))
            }
        }
    }

    async fn read(&self, claimed: &ClaimedItem) -> Result<LineReader, SourceError> {
        LineReader::open(PathBuf::from(&claimed.claim_id)).await
    }

    async fn complete(&self, claimed: ClaimedItem) -> Result<(), SourceError> {
        let (item, claim_id) = claimed.consume();
        let original = PathBuf::from(&item.id);
        let processed =
            local_processed_path(&original).ok_or_else(|| SourceError::NotJl(item.id.clone()))?;

        tokio::fs::rename(&claim_id, &processed)
            .await
            .map_err(|e| SourceError::io(&claim_id, e))?;
        info!(file = %item, processed = %processed.display(), "Marked file processed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn list_filters_non_candidates() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "a.jl",
            "b_processed.jl",
            "c_processed.jl.processing",
            "d.json",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("nested.jl")).unwrap();

        let source = LocalDirSource::new(dir.path());
        let items = source.list().await.unwrap();

        assert_eq!(items.len(), 1);
        assert!(items[0].id.ends_with("a.jl"));
    }

    #[tokio::test]
    async fn claim_read_complete() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("foo.jl"), "line one\nline two\n").unwrap();
        let source = LocalDirSource::new(dir.path());

        let item = source.list().await.unwrap().remove(0);
        let claimed = source.claim(&item).await.unwrap();
        assert_eq!(names(dir.path()), vec!["foo_processed.jl.processing"]);
        assert!(source.list().await.unwrap().is_empty());

        let mut reader = source.read(&claimed).await.unwrap();
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("line one"));
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("line two"));
        assert_eq!(reader.next_line().await.unwrap(), None);
        drop(reader);

        source.complete(claimed).await.unwrap();
        assert_eq!(names(dir.path()), vec!["foo_processed.jl"]);
    }

    #[tokio::test]
    async fn second_claim_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("foo.jl"), "").unwrap();
        let source = LocalDirSource::new(dir.path());
        let item = source.list().await.unwrap().remove(0);

        let first = source.claim(&item).await.unwrap();
        let second = source.claim(&item).await;

        assert!(matches!(second, Err(SourceError::AlreadyClaimed(_))));
        first.abandon();
        assert_eq!(names(dir.path()), vec!["foo_processed.jl.processing"]);
    }

    #[tokio::test]
    async fn rename_failure_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("foo.jl"), "").unwrap();
        // A non-empty directory where the claim marker would go.
        let blocker = dir.path().join("foo_processed.jl.processing");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "").unwrap();

        let source = LocalDirSource::new(dir.path());
        let item = source.list().await.unwrap().remove(0);
        let err = source.claim(&item).await.unwrap_err();

        assert!(matches!(err, SourceError::Io { .. }), "got {err:?}");
        assert!(dir.path().join("foo.jl").exists());
    }
}
