//! Materializes bundled model assets as plain files in a writable cache
//! directory and refreshes them when the running app version changes.

mod assets;
mod manifest;
mod progress;
mod version;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use assets::{AssetSource, DirAssets, MemoryAssets};
pub use manifest::{
    AssetManifest, NLU_METADATA, NLU_MODEL, WAKE_DETECT_MODEL, WAKE_ENCODE_MODEL,
    WAKE_FILTER_MODEL, WORDPIECE_VOCAB,
};
pub use progress::{CacheProgress, ProgressTracker};
pub use version::{JsonPrefs, MemoryVersionStore, VersionStore, ABSENT_VERSION, VERSION_KEY};

const COPY_BUFFER_SIZE: usize = 8192;
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid asset manifest: {0}")]
    InvalidManifest(String),
    #[error("Failed to read bundled asset {asset}: {source}")]
    SourceRead {
        asset: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write cached asset {asset} to {}: {source}", .path.display())]
    CacheWrite {
        asset: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to persist model version marker: {0}")]
    VersionStore(#[source] io::Error),
}

impl CacheError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidManifest(_) => {
                "The app's model list is misconfigured. Please reinstall the app."
            }
            Self::SourceRead { .. } => {
                "A bundled voice model is missing from the app package. Please reinstall the app."
            }
            Self::CacheWrite { .. } | Self::VersionStore(_) => {
                "The app could not write its voice models. Check disk space and permissions."
            }
        }
    }

    /// Name of the asset whose copy failed, when the error concerns one.
    pub fn asset(&self) -> Option<&str> {
        match self {
            Self::SourceRead { asset, .. } | Self::CacheWrite { asset, .. } => Some(asset),
            Self::InvalidManifest(_) | Self::VersionStore(_) => None,
        }
    }
}

/// How the cache decides that the manifest is already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceCheck {
    /// Only the manifest's sentinel file is checked. A partially written
    /// set with the sentinel present goes unnoticed.
    #[default]
    Sentinel,
    /// Every manifest file must exist.
    Manifest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub presence: PresenceCheck,
    /// Write the version marker after the first-run copy as well. Off in the
    /// legacy policy, which only records it after a version-triggered refresh.
    pub record_version_on_first_run: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            presence: PresenceCheck::Sentinel,
            record_version_on_first_run: false,
        }
    }
}

impl CachePolicy {
    pub fn strict() -> Self {
        Self {
            presence: PresenceCheck::Manifest,
            record_version_on_first_run: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheOutcome {
    /// Nothing was cached yet; every asset was copied.
    Populated,
    /// The cache existed but was recorded for another version (or none).
    Refreshed { previous: Option<i64> },
    /// Cached files match the running version; nothing was written.
    UpToDate,
}

impl CacheOutcome {
    pub fn copied(&self) -> bool {
        !matches!(self, Self::UpToDate)
    }
}

#[derive(Debug, Clone)]
pub struct ModelCache {
    manifest: AssetManifest,
    cache_dir: PathBuf,
    policy: CachePolicy,
    progress: ProgressTracker,
}

impl ModelCache {
    pub fn new<P: AsRef<Path>>(manifest: AssetManifest, cache_dir: P) -> Self {
        Self {
            manifest,
            cache_dir: cache_dir.as_ref().to_path_buf(),
            policy: CachePolicy::default(),
            progress: ProgressTracker::new(),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.manifest.path_in(&self.cache_dir, name)
    }

    pub fn missing_files(&self) -> Vec<String> {
        self.manifest.missing_files(&self.cache_dir)
    }

    pub fn is_cached(&self) -> bool {
        match self.policy.presence {
            PresenceCheck::Sentinel => self.path_for(self.manifest.sentinel()).exists(),
            PresenceCheck::Manifest => self.missing_files().is_empty(),
        }
    }

    /// Brings the cache in line with `app_version`.
    ///
    /// Not safe to run concurrently against the same directory or store;
    /// callers serialize invocations.
    pub fn ensure(
        &self,
        app_version: i64,
        assets: &dyn AssetSource,
        versions: &mut dyn VersionStore,
    ) -> Result<CacheOutcome, CacheError> {
        if !self.is_cached() {
            log::info!(
                "Model cache at {} is empty; copying {} bundled assets",
                self.cache_dir.display(),
                self.manifest.len()
            );
            self.copy_all(assets)?;

            if self.policy.record_version_on_first_run {
                versions.set(app_version).map_err(CacheError::VersionStore)?;
            }
            return Ok(CacheOutcome::Populated);
        }

        let saved = versions.get();
        if saved == Some(app_version) {
            log::debug!("Cached models are current for version {app_version}");
            self.progress.start_tracking(0);
            self.progress.mark_finished();
            return Ok(CacheOutcome::UpToDate);
        }

        log::info!(
            "Cached models were recorded for version {:?}, running {app_version}; refreshing",
            saved
        );
        self.copy_all(assets)?;
        versions.set(app_version).map_err(CacheError::VersionStore)?;

        Ok(CacheOutcome::Refreshed { previous: saved })
    }

    fn copy_all(&self, assets: &dyn AssetSource) -> Result<(), CacheError> {
        self.progress.start_tracking(self.manifest.len());

        let result: Result<(), CacheError> = (|| {
            fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::CacheWrite {
                asset: self.manifest.files()[0].clone(),
                path: self.cache_dir.clone(),
                source,
            })?;

            for (index, name) in self.manifest.files().iter().enumerate() {
                self.progress
                    .set_file_index(index + 1, assets.size_hint(name).unwrap_or(0));
                self.copy_asset(assets, name)?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.progress.mark_finished();
                log::info!("Cached {} model assets", self.manifest.len());
                Ok(())
            }
            Err(err) => {
                log::error!("Model cache refresh aborted: {err}");
                self.progress.record_failure(err.user_message().to_string());
                Err(err)
            }
        }
    }

    fn copy_asset(&self, assets: &dyn AssetSource, name: &str) -> Result<(), CacheError> {
        let dest = self.path_for(name);
        let tmp = partial_path(&dest);

        let read_err = |source| CacheError::SourceRead {
            asset: name.to_string(),
            source,
        };
        let write_err = |source| CacheError::CacheWrite {
            asset: name.to_string(),
            path: dest.clone(),
            source,
        };

        let mut reader = assets.open(name).map_err(read_err)?;

        let result: Result<(), CacheError> = (|| {
            let mut file = fs::File::create(&tmp).map_err(write_err)?;
            let mut buffer = [0u8; COPY_BUFFER_SIZE];
            let mut copied: u64 = 0;

            loop {
                let bytes_read = match reader.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(read_err(e)),
                };
                file.write_all(&buffer[..bytes_read]).map_err(write_err)?;
                copied += bytes_read as u64;
                self.progress.update_copied_bytes(copied);
            }

            file.flush().map_err(write_err)?;
            drop(file);
            fs::rename(&tmp, &dest).map_err(write_err)?;

            log::debug!("Cached {name} ({copied} bytes) at {}", dest.display());
            Ok(())
        })();

        if result.is_err() && tmp.exists() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut raw = dest.as_os_str().to_owned();
    raw.push(PARTIAL_SUFFIX);
    PathBuf::from(raw)
}

/// Ensures every asset in `manifest` is cached under `cache_dir` using the
/// legacy [`CachePolicy`].
pub fn ensure_assets_cached(
    manifest: &AssetManifest,
    current_version: i64,
    cache_dir: &Path,
    assets: &dyn AssetSource,
    versions: &mut dyn VersionStore,
) -> Result<CacheOutcome, CacheError> {
    ModelCache::new(manifest.clone(), cache_dir).ensure(current_version, assets, versions)
}
