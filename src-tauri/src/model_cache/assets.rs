use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// Read-only store of named blobs shipped with the application.
pub trait AssetSource {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>>;

    /// Byte length of the asset if the source knows it up front.
    fn size_hint(&self, _name: &str) -> Option<u64> {
        None
    }
}

/// Assets laid out as plain files in one directory, e.g. a bundle resource dir.
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirAssets {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        let file = fs::File::open(self.root.join(name))?;
        Ok(Box::new(file))
    }

    fn size_hint(&self, name: &str) -> Option<u64> {
        fs::metadata(self.root.join(name)).map(|m| m.len()).ok()
    }
}

/// In-memory assets, typically filled from `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    blobs: HashMap<String, Cow<'static, [u8]>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, bytes: impl Into<Cow<'static, [u8]>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: &str, bytes: impl Into<Cow<'static, [u8]>>) {
        self.blobs.insert(name.to_string(), bytes.into());
    }
}

impl AssetSource for MemoryAssets {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        let bytes = self.blobs.get(name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no bundled asset named {name}"),
            )
        })?;
        Ok(Box::new(Cursor::new(&**bytes)))
    }

    fn size_hint(&self, name: &str) -> Option<u64> {
        self.blobs.get(name).map(|b| b.len() as u64)
    }
}
