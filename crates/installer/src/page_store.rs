//! Page storage.
//!
//! The main page step only needs to know whether a page exists and how to
//! create it. [`FilePageStore`] keeps one JSON record per page under the site
//! directory.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Identity recorded as the author of pages created by the installer.
pub const SYSTEM_AUTHOR: &str = "MediaWiki default";

/// Title of the page a fresh wiki lands on.
pub const MAIN_PAGE_TITLE: &str = "Main Page";

/// Errors raised by a page store.
#[derive(Debug, Error)]
pub enum PageStoreError {
    /// Underlying storage failed.
    #[error("I/O error on page '{page}': {source}")]
    Io {
        page: String,
        #[source]
        source: std::io::Error,
    },

    /// The page was created by someone else in the meantime.
    #[error("Page '{0}' already exists")]
    AlreadyExists(String),

    /// The title cannot be stored.
    #[error("Invalid page title: '{0}'")]
    InvalidTitle(String),

    /// Record could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reference to a page by title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef(String);

impl PageRef {
    pub fn new(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    #[must_use]
    pub fn main_page() -> Self {
        Self::new(MAIN_PAGE_TITLE)
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.0
    }

    /// Storage key: spaces become underscores, as in wiki URLs.
    fn db_key(&self) -> Result<String, PageStoreError> {
        let title = self.0.trim();
        if title.is_empty() || title.contains(|c: char| c == '/' || c == '\\') || title.starts_with('.') {
            return Err(PageStoreError::InvalidTitle(self.0.clone()));
        }
        Ok(title.replace(' ', "_"))
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who an edit is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorIdentity(String);

impl AuthorIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The installer's own identity.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SYSTEM_AUTHOR)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Page storage used by content-writing steps.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Whether a page with this title exists.
    async fn exists(&self, page: &PageRef) -> Result<bool, PageStoreError>;

    /// Create a page. Never overwrites an existing one.
    async fn write(
        &self,
        page: &PageRef,
        content: &str,
        author: &AuthorIdentity,
    ) -> Result<(), PageStoreError>;
}

/// A stored page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub title: String,
    pub author: String,
    pub created_at: String,
    pub content: String,
}

/// [`PageStore`] keeping `<db key>.json` records in a directory.
#[derive(Debug, Clone)]
pub struct FilePageStore {
    root: PathBuf,
}

impl FilePageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, page: &PageRef) -> Result<PathBuf, PageStoreError> {
        Ok(self.root.join(format!("{}.json", page.db_key()?)))
    }

    /// Load a stored page, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read or decoded.
    pub async fn read(&self, page: &PageRef) -> Result<Option<PageRecord>, PageStoreError> {
        let path = self.record_path(page)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PageStoreError::Io {
                page: page.to_string(),
                source,
            }),
        }
    }
}

#[async_trait]
impl PageStore for FilePageStore {
    async fn exists(&self, page: &PageRef) -> Result<bool, PageStoreError> {
        let path = self.record_path(page)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|source| PageStoreError::Io {
                page: page.to_string(),
                source,
            })
    }

    async fn write(
        &self,
        page: &PageRef,
        content: &str,
        author: &AuthorIdentity,
    ) -> Result<(), PageStoreError> {
        let path = self.record_path(page)?;
        let io_err = |source: std::io::Error| PageStoreError::Io {
            page: page.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.root).await.map_err(io_err)?;

        let record = PageRecord {
            title: page.title().to_string(),
            author: author.name().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            content: content.to_string(),
        };
        let encoded = serde_json::to_string_pretty(&record)?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(PageStoreError::AlreadyExists(page.to_string()));
            }
            Err(e) => return Err(io_err(e)),
        };
        file.write_all(encoded.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        debug!(page = %page, path = %path.display(), "Page written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_db_key() {
        assert_eq!(PageRef::main_page().db_key().unwrap(), "Main_Page");
        assert!(PageRef::new("").db_key().is_err());
        assert!(PageRef::new("../etc/passwd").db_key().is_err());
        assert!(PageRef::new("a/b").db_key().is_err());
    }

    #[tokio::test]
    async fn test_write_then_exists_and_read() {
        let dir = TempDir::new().unwrap();
        let store = FilePageStore::new(dir.path().join("pages"));
        let page = PageRef::main_page();

        assert!(!store.exists(&page).await.unwrap());
        store
            .write(&page, "Welcome", &AuthorIdentity::system())
            .await
            .unwrap();
        assert!(store.exists(&page).await.unwrap());

        let record = store.read(&page).await.unwrap().unwrap();
        assert_eq!(record.title, "Main Page");
        assert_eq!(record.author, "MediaWiki default");
        assert_eq!(record.content, "Welcome");
        assert!(dir.path().join("pages/Main_Page.json").exists());
    }

    #[tokio::test]
    async fn test_write_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FilePageStore::new(dir.path());
        let page = PageRef::new("Help");
        let author = AuthorIdentity::new("Admin");

        store.write(&page, "first", &author).await.unwrap();
        let err = store.write(&page, "second", &author).await.unwrap_err();
        assert!(matches!(err, PageStoreError::AlreadyExists(_)));

        let record = store.read(&page).await.unwrap().unwrap();
        assert_eq!(record.content, "first");
    }

    #[tokio::test]
    async fn test_read_missing_page() {
        let dir = TempDir::new().unwrap();
        let store = FilePageStore::new(dir.path());
        assert!(store.read(&PageRef::new("Nope")).await.unwrap().is_none());
    }
}
