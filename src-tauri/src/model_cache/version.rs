use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

pub const VERSION_KEY: &str = "versionCode";

/// Value older builds wrote for "never recorded"; reads back as absent.
pub const ABSENT_VERSION: i64 = -1;

/// Persisted marker of the app version the cached models were refreshed for.
pub trait VersionStore {
    fn get(&self) -> Option<i64>;
    fn set(&mut self, version: i64) -> io::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryVersionStore {
    version: Option<i64>,
}

impl MemoryVersionStore {
    pub fn new(version: Option<i64>) -> Self {
        Self { version }
    }
}

impl VersionStore for MemoryVersionStore {
    fn get(&self) -> Option<i64> {
        self.version.filter(|v| *v != ABSENT_VERSION)
    }

    fn set(&mut self, version: i64) -> io::Result<()> {
        self.version = Some(version);
        Ok(())
    }
}

/// Flat JSON object file holding small integer preferences, `AppPrefs.json` style.
#[derive(Debug, Clone)]
pub struct JsonPrefs {
    path: PathBuf,
    key: String,
}

impl JsonPrefs {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_key(path, VERSION_KEY)
    }

    pub fn with_key<P: AsRef<Path>>(path: P, key: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            key: key.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Map<String, Value> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Map::new(),
            Err(err) => {
                log::warn!("Failed to read prefs at {}: {err}", self.path.display());
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                log::warn!(
                    "Prefs at {} are not a JSON object; treating as empty",
                    self.path.display()
                );
                Map::new()
            }
        }
    }
}

impl VersionStore for JsonPrefs {
    fn get(&self) -> Option<i64> {
        self.read_map()
            .get(&self.key)
            .and_then(Value::as_i64)
            .filter(|v| *v != ABSENT_VERSION)
    }

    fn set(&mut self, version: i64) -> io::Result<()> {
        let mut map = self.read_map();
        map.insert(self.key.clone(), Value::from(version));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let body = serde_json::to_vec_pretty(&Value::Object(map)).map_err(io::Error::other)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)
    }
}
