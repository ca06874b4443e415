//! Filesystem Probe using tokio::fs

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    probe::FilesystemProbe,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Standard filesystem probe for desktop platforms.
///
/// Pure read-side access; never creates or mutates anything. Inventory
/// scanners use this to enumerate and read storefront manifests.
pub struct StdFilesystemProbe;

impl StdFilesystemProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdFilesystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FilesystemProbe for StdFilesystemProbe {
    async fn dir_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn list_files(&self, path: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path).await.map_err(BridgeError::Io)?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(BridgeError::Io)? {
            let entry_path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(ext) = extension {
                let matches = entry_path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case(ext))
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
            }
            files.push(entry_path);
        }

        debug!(path = %path.display(), count = files.len(), "Listed manifest files");
        Ok(files)
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(BridgeError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_directory_reports_absent() {
        let probe = StdFilesystemProbe::new();
        assert!(
            !probe
                .dir_exists(Path::new("/nonexistent/game/library"))
                .await
        );
    }

    #[tokio::test]
    async fn test_list_files_filters_extension() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.item"), b"{}").await.unwrap();
        tokio::fs::write(dir.path().join("b.tmp"), b"x").await.unwrap();

        let probe = StdFilesystemProbe::new();
        let files = probe.list_files(dir.path(), Some("item")).await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.item"));
    }

    #[tokio::test]
    async fn test_read_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.item");
        tokio::fs::write(&path, b"{\"key\":\"x\"}").await.unwrap();

        let probe = StdFilesystemProbe::new();
        let bytes = probe.read_file(&path).await.unwrap();
        assert_eq!(bytes, b"{\"key\":\"x\"}");
    }
}
