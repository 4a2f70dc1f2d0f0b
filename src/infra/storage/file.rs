use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::{DurableStore, StoreError};

/// Longest hex-encoded key used verbatim as a file stem.
const MAX_HEX_STEM: usize = 200;

/// Directory-backed store: one file per key, replaced atomically on write.
///
/// File names are the hex-encoded key, so arbitrary keys never escape the
/// directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `directory`.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.directory.join(format!("{}.json", file_stem(key))))
    }
}

/// Hex of the key, or a SHA-256 digest once that would exceed filename limits.
///
/// The `sha256-` prefix is not valid hex, so the two forms never collide.
fn file_stem(key: &str) -> String {
    let encoded = hex::encode(key);
    if encoded.len() <= MAX_HEX_STEM {
        return encoded;
    }
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("sha256-{}", hex::encode(hasher.finalize()))
}

impl DurableStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let mut file = NamedTempFile::new_in(&self.directory)?;
        file.write_all(value.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
