//! Lazily resolved handle to the configured search index.
//!
//! Resolution happens on first use. A live index is re-validated with a ping
//! every time it is handed out; a failed open or ping is never remembered,
//! so the next call tries again.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::index::SearchIndex;
use crate::lexical::DocumentIndex;

enum IndexSource {
    Disabled,
    Fixed(Arc<dyn SearchIndex>),
    Directory { path: PathBuf, writer_heap: usize },
}

/// Process-wide, injectable access point to the search index.
pub struct IndexHandle {
    source: IndexSource,
    cached: Mutex<Option<Arc<dyn SearchIndex>>>,
}

impl IndexHandle {
    /// No index configured; [`resolve`](Self::resolve) always yields `None`.
    pub fn disabled() -> Self {
        Self::from_source(IndexSource::Disabled)
    }

    /// Always hand out `index`.
    pub fn fixed(index: Arc<dyn SearchIndex>) -> Self {
        Self::from_source(IndexSource::Fixed(index))
    }

    /// Open a [`DocumentIndex`] at `path` on first use.
    pub fn directory(path: PathBuf, writer_heap: usize) -> Self {
        Self::from_source(IndexSource::Directory { path, writer_heap })
    }

    fn from_source(source: IndexSource) -> Self {
        Self { source, cached: Mutex::new(None) }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.source, IndexSource::Disabled)
    }

    /// The live index, or `None` when disabled or unavailable right now.
    pub async fn resolve(&self) -> Option<Arc<dyn SearchIndex>> {
        let (path, writer_heap) = match &self.source {
            IndexSource::Disabled => return None,
            IndexSource::Fixed(index) => return Some(index.clone()),
            IndexSource::Directory { path, writer_heap } => (path, *writer_heap),
        };

        let mut cached = self.cached.lock().await;

        if let Some(index) = cached.as_ref() {
            match index.ping().await {
                Ok(()) => return Some(index.clone()),
                Err(e) => {
                    log::warn!("search index at {} failed health check: {:#}", path.display(), e);
                    *cached = None;
                }
            }
        }

        match open_blocking(path.clone(), writer_heap, false).await {
            Ok(index) => {
                log::debug!("opened search index at {}", path.display());
                let index: Arc<dyn SearchIndex> = Arc::new(index);
                *cached = Some(index.clone());
                Some(index)
            }
            Err(e) => {
                log::warn!("search index at {} unavailable: {:#}", path.display(), e);
                None
            }
        }
    }

    /// Replace the directory index with an empty one using the fixed schema.
    /// For other sources this clears the current index.
    pub async fn recreate(&self) -> anyhow::Result<()> {
        match &self.source {
            IndexSource::Disabled => anyhow::bail!("Search index is disabled"),
            IndexSource::Fixed(index) => index.clear().await,
            IndexSource::Directory { path, writer_heap } => {
                let mut cached = self.cached.lock().await;
                // The old writer must be gone before the directory is wiped
                *cached = None;
                let index = open_blocking(path.clone(), *writer_heap, true).await?;
                *cached = Some(Arc::new(index));
                Ok(())
            }
        }
    }
}

/// Tantivy open/recreate touches the filesystem; keep it off the runtime.
async fn open_blocking(path: PathBuf, writer_heap: usize, fresh: bool) -> anyhow::Result<DocumentIndex> {
    tokio::task::spawn_blocking(move || {
        if fresh {
            DocumentIndex::recreate(&path, writer_heap)
        } else {
            DocumentIndex::open(&path, writer_heap)
        }
    })
    .await
    .map_err(|e| anyhow::anyhow!("Index open task failed: {}", e))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::NoopIndex;
    use crate::lexical::DEFAULT_WRITER_HEAP;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_disabled_never_resolves() {
        let handle = IndexHandle::disabled();
        assert!(!handle.is_enabled());
        assert!(handle.resolve().await.is_none());
        assert!(handle.recreate().await.is_err());
    }

    #[tokio::test]
    async fn test_fixed_always_resolves() {
        let handle = IndexHandle::fixed(Arc::new(NoopIndex));
        assert!(handle.resolve().await.is_some());
    }

    #[tokio::test]
    async fn test_directory_is_cached_after_open() {
        let dir = tempdir().unwrap();
        let handle = IndexHandle::directory(dir.path().join("idx"), DEFAULT_WRITER_HEAP);

        let first = handle.resolve().await.unwrap();
        let second = handle.resolve().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_vanished_directory_is_reopened() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx");
        let handle = IndexHandle::directory(path.clone(), DEFAULT_WRITER_HEAP);

        let first = handle.resolve().await.unwrap();
        std::fs::remove_dir_all(&path).unwrap();

        let second = handle.resolve().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(path.join("meta.json").exists());
    }

    #[tokio::test]
    async fn test_resolves_while_another_writer_holds_the_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx");

        let other = DocumentIndex::open(&path, DEFAULT_WRITER_HEAP).unwrap();
        other.clear().await.unwrap();

        let handle = IndexHandle::directory(path, DEFAULT_WRITER_HEAP);
        let index = handle.resolve().await.unwrap();
        assert!(index.search(&crate::index::SearchRequest::new("", 10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_open_is_retried() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx");
        // A plain file where the index directory should be
        std::fs::write(&path, b"not a directory").unwrap();

        let handle = IndexHandle::directory(path.clone(), DEFAULT_WRITER_HEAP);
        assert!(handle.resolve().await.is_none());

        std::fs::remove_file(&path).unwrap();
        assert!(handle.resolve().await.is_some());
    }
}
