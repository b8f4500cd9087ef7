use std::path::{Path, PathBuf};

use super::CacheError;

pub const WAKE_DETECT_MODEL: &str = "detect.lite";
pub const WAKE_ENCODE_MODEL: &str = "encode.lite";
pub const WAKE_FILTER_MODEL: &str = "filter.lite";
pub const NLU_MODEL: &str = "nlu.tflite";
pub const NLU_METADATA: &str = "metadata.json";
pub const WORDPIECE_VOCAB: &str = "vocab.txt";

const DEFAULT_FILES: &[&str] = &[
    WAKE_DETECT_MODEL,
    WAKE_ENCODE_MODEL,
    WAKE_FILTER_MODEL,
    NLU_MODEL,
    NLU_METADATA,
    WORDPIECE_VOCAB,
];

/// Ordered set of bundled asset names that must be materialized in the cache.
///
/// One member is the sentinel: its presence on disk stands in for the whole
/// set when the cache runs with [`PresenceCheck::Sentinel`](super::PresenceCheck).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    files: Vec<String>,
    sentinel: String,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            files: DEFAULT_FILES.iter().map(|f| (*f).to_string()).collect(),
            sentinel: WAKE_FILTER_MODEL.to_string(),
        }
    }
}

impl AssetManifest {
    pub fn new<I, S>(files: I, sentinel: &str) -> Result<Self, CacheError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files: Vec<String> = files.into_iter().map(Into::into).collect();

        if files.is_empty() {
            return Err(CacheError::InvalidManifest(
                "manifest has no files".to_string(),
            ));
        }

        for (index, name) in files.iter().enumerate() {
            validate_name(name)?;
            if files[..index].contains(name) {
                return Err(CacheError::InvalidManifest(format!(
                    "duplicate asset name '{name}'"
                )));
            }
        }

        if !files.iter().any(|f| f == sentinel) {
            return Err(CacheError::InvalidManifest(format!(
                "sentinel '{sentinel}' is not part of the manifest"
            )));
        }

        Ok(Self {
            files,
            sentinel: sentinel.to_string(),
        })
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn path_in(&self, cache_dir: &Path, name: &str) -> PathBuf {
        cache_dir.join(name)
    }

    /// Manifest entries with no file under `cache_dir`, in manifest order.
    pub fn missing_files(&self, cache_dir: &Path) -> Vec<String> {
        self.files
            .iter()
            .filter(|name| !cache_dir.join(name.as_str()).exists())
            .cloned()
            .collect()
    }
}

fn validate_name(name: &str) -> Result<(), CacheError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');

    if invalid {
        return Err(CacheError::InvalidManifest(format!(
            "'{name}' is not a plain file name"
        )));
    }
    Ok(())
}
