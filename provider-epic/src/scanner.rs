//! Install manifest scanner
//!
//! Reads the launcher's `.item` manifest directory through the host's
//! `FilesystemProbe` and turns each manifest into an `InstalledEntry`.

use async_trait::async_trait;
use bridge_traits::probe::FilesystemProbe;
use core_library::models::InstalledEntry;
use core_sync::error::ProviderError;
use core_sync::provider::InventoryScanner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::types::InstallManifest;

/// Scans an Epic launcher manifest directory.
///
/// Stateless across scans: every call re-reads the directory. A missing
/// directory means nothing is installed; a manifest that fails to parse
/// is skipped with a warning and never aborts the scan.
pub struct EpicInventoryScanner {
    probe: Arc<dyn FilesystemProbe>,
    manifest_dir: PathBuf,
}

impl EpicInventoryScanner {
    pub fn new(probe: Arc<dyn FilesystemProbe>, manifest_dir: PathBuf) -> Self {
        Self { probe, manifest_dir }
    }

    fn entry_from_manifest(manifest: InstallManifest) -> InstalledEntry {
        let launch_args = manifest
            .launch_command
            .split_whitespace()
            .map(str::to_string)
            .collect();
        InstalledEntry {
            key: manifest.catalog_item_id.as_str().into(),
            display_name: manifest.display_name,
            install_path: manifest.install_location,
            executable_path: manifest.launch_executable,
            launch_args,
        }
    }
}

#[async_trait]
impl InventoryScanner for EpicInventoryScanner {
    #[instrument(skip(self), fields(dir = %self.manifest_dir.display()))]
    async fn scan(&self) -> Result<Vec<InstalledEntry>, ProviderError> {
        if !self.probe.dir_exists(&self.manifest_dir).await {
            debug!("Manifest directory absent; no local installs");
            return Ok(Vec::new());
        }

        let files = self
            .probe
            .list_files(&self.manifest_dir, Some("item"))
            .await
            .map_err(|e| ProviderError::Scan(e.to_string()))?;

        let mut entries = Vec::with_capacity(files.len());
        for path in files {
            let bytes = match self.probe.read_file(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable manifest skipped");
                    continue;
                }
            };
            let manifest: InstallManifest = match serde_json::from_slice(&bytes) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt manifest skipped");
                    continue;
                }
            };
            if manifest.is_incomplete_install {
                debug!(app = %manifest.app_name, "Skipping incomplete install");
                continue;
            }
            entries.push(Self::entry_from_manifest(manifest));
        }

        debug!(installed = entries.len(), "Scan complete");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::collections::HashMap;
    use std::path::Path;

    /// In-memory probe over a fixed path → contents map.
    struct FakeProbe {
        files: HashMap<PathBuf, Vec<u8>>,
        dir_present: bool,
        fail_listing: bool,
    }

    impl FakeProbe {
        fn with_files(files: Vec<(&str, Vec<u8>)>) -> Self {
            Self {
                files: files
                    .into_iter()
                    .map(|(p, c)| (PathBuf::from(p), c))
                    .collect(),
                dir_present: true,
                fail_listing: false,
            }
        }
    }

    #[async_trait]
    impl FilesystemProbe for FakeProbe {
        async fn dir_exists(&self, _path: &Path) -> bool {
            self.dir_present
        }

        async fn list_files(
            &self,
            _path: &Path,
            extension: Option<&str>,
        ) -> BridgeResult<Vec<PathBuf>> {
            if self.fail_listing {
                return Err(BridgeError::OperationFailed("io".into()));
            }
            let mut paths: Vec<PathBuf> = self
                .files
                .keys()
                .filter(|p| {
                    extension.map_or(true, |ext| {
                        p.extension().and_then(|e| e.to_str()) == Some(ext)
                    })
                })
                .cloned()
                .collect();
            paths.sort();
            Ok(paths)
        }

        async fn read_file(&self, path: &Path) -> BridgeResult<Vec<u8>> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| BridgeError::OperationFailed("permission denied".into()))
        }
    }

    fn manifest_json(id: &str, name: &str) -> Vec<u8> {
        format!(
            r#"{{"CatalogItemId":"{}","DisplayName":"{}","InstallLocation":"/g/{}","LaunchExecutable":"run.exe","LaunchCommand":"-windowed"}}"#,
            id, name, id
        )
        .into_bytes()
    }

    fn scanner(probe: FakeProbe) -> EpicInventoryScanner {
        EpicInventoryScanner::new(Arc::new(probe), PathBuf::from("/m"))
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty_library() {
        let probe = FakeProbe {
            dir_present: false,
            ..FakeProbe::with_files(vec![])
        };
        assert!(scanner(probe).scan().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_manifest_is_skipped() {
        let probe = FakeProbe::with_files(vec![
            ("/m/bad.item", b"{not json".to_vec()),
            ("/m/good.item", manifest_json("abc", "Rocket Racer")),
        ]);
        let entries = scanner(probe).scan().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_name, "Rocket Racer");
        assert_eq!(entries[0].launch_args, vec!["-windowed".to_string()]);
    }

    #[tokio::test]
    async fn test_non_item_files_are_ignored() {
        let probe = FakeProbe::with_files(vec![
            ("/m/good.item", manifest_json("abc", "Rocket Racer")),
            ("/m/notes.txt", b"unrelated".to_vec()),
        ]);
        let entries = scanner(probe).scan().await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_install_is_skipped() {
        let json = br#"{"CatalogItemId":"abc","DisplayName":"Half Done","InstallLocation":"/g/abc","LaunchExecutable":"run.exe","bIsIncompleteInstall":true}"#;
        let probe = FakeProbe::with_files(vec![("/m/half.item", json.to_vec())]);
        assert!(scanner(probe).scan().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_is_a_scan_error() {
        let probe = FakeProbe {
            fail_listing: true,
            ..FakeProbe::with_files(vec![])
        };
        assert!(matches!(
            scanner(probe).scan().await,
            Err(ProviderError::Scan(_))
        ));
    }
}
