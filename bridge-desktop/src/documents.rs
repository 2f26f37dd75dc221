//! Document Store Implementation backed by the local filesystem
//!
//! On desktop a picked document location is a plain path, optionally written
//! as a `file://` URL.

use bridge_traits::{
    documents::{DocumentLocation, DocumentStore},
    error::{BridgeError, Result},
};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem-backed [`DocumentStore`]
#[derive(Debug, Clone, Default)]
pub struct LocalDocumentStore;

impl LocalDocumentStore {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a location into a filesystem path
    fn resolve(location: &DocumentLocation) -> Result<PathBuf> {
        let raw = location.as_str();
        let path = raw.strip_prefix("file://").unwrap_or(raw);

        if path.is_empty() {
            return Err(BridgeError::OperationFailed(
                "Empty document location".to_string(),
            ));
        }

        Ok(PathBuf::from(path))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                debug!(path = ?parent, "Created directory");
            }
        }
        Ok(())
    }
}

impl DocumentStore for LocalDocumentStore {
    fn open_read(&self, location: &DocumentLocation) -> Result<Box<dyn Read + Send>> {
        let path = Self::resolve(location)?;
        let file = File::open(&path)?;
        debug!(path = ?path, "Opened document for reading");
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_write(&self, location: &DocumentLocation) -> Result<Box<dyn Write + Send>> {
        let path = Self::resolve(location)?;
        Self::ensure_parent(&path)?;
        let file = File::create(&path)?;
        debug!(path = ?path, "Opened document for writing");
        Ok(Box::new(BufWriter::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use uuid::Uuid;

    #[test]
    fn test_write_then_read_through_file_url() {
        let dir = env::temp_dir().join(format!("bridge-desktop-{}", Uuid::new_v4()));
        let path = dir.join("nested").join("doc.bin");
        let location = DocumentLocation::new(format!("file://{}", path.display()));
        let store = LocalDocumentStore::new();

        {
            let mut writer = store.open_write(&location).unwrap();
            writer.write_all(b"document bytes").unwrap();
            writer.flush().unwrap();
        }

        let mut contents = Vec::new();
        store
            .open_read(&location)
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"document bytes");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_document_is_io_error() {
        let store = LocalDocumentStore::new();
        let location = DocumentLocation::new(
            env::temp_dir()
                .join(format!("missing-{}", Uuid::new_v4()))
                .display()
                .to_string(),
        );

        assert!(matches!(store.open_read(&location), Err(BridgeError::Io(_))));
    }

    #[test]
    fn test_empty_location_rejected() {
        let store = LocalDocumentStore::new();
        assert!(store.open_read(&DocumentLocation::new("file://")).is_err());
    }
}
