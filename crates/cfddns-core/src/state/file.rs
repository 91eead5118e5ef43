// # File Address Store
//
// One plain-text file per record, holding the last address written.
//
// ## Layout
//
// ```text
// <state_dir>/
//   home.example.com      "203.0.113.7"
//   vpn.example.com       "203.0.113.7"
// ```
//
// ## Storage keys
//
// Record names come from configuration and are not trusted as paths. Each
// name is escaped into a single file name: bytes outside `[A-Za-z0-9._-]`
// become `%XX` and a leading `.` becomes `%2E`. The escaping is injective,
// so two distinct record names never share a file, and ordinary names map
// to themselves.
//
// ## Writes
//
// Write-then-rename: the new address goes to a hidden temp file which is
// then renamed over the target.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::AddressStore;

/// File-based address store
///
/// # Example
///
/// ```rust,no_run
/// use cfddns_core::state::FileAddressStore;
/// use cfddns_core::traits::AddressStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileAddressStore::new("/var/lib/cfddns").await?;
///
///     store.write_stored("home.example.com", "1.2.3.4").await?;
///
///     let stored = store.read_stored("home.example.com").await?;
///     assert_eq!(stored.as_deref(), Some("1.2.3.4"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileAddressStore {
    dir: PathBuf,
}

impl FileAddressStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(&dir).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        tracing::debug!("Using state directory {}", dir.display());
        Ok(Self { dir })
    }

    /// Directory holding the address files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `record_name`
    pub fn path_for(&self, record_name: &str) -> PathBuf {
        self.dir.join(storage_key(record_name))
    }

    fn temp_path_for(&self, record_name: &str) -> PathBuf {
        self.dir.join(format!(".{}.tmp", storage_key(record_name)))
    }
}

/// Escape a record name into a single safe file name
pub fn storage_key(record_name: &str) -> String {
    let mut key = String::with_capacity(record_name.len());

    for (i, byte) in record_name.bytes().enumerate() {
        let plain = byte.is_ascii_alphanumeric()
            || byte == b'-'
            || byte == b'_'
            || (byte == b'.' && i > 0);

        if plain {
            key.push(byte as char);
        } else {
            let _ = write!(key, "%{:02X}", byte);
        }
    }

    key
}

#[async_trait]
impl AddressStore for FileAddressStore {
    async fn read_stored(&self, record_name: &str) -> Result<Option<String>, Error> {
        let path = self.path_for(record_name);

        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No stored address yet: {}", path.display());
                Ok(None)
            }
            Err(e) => Err(Error::state_store(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write_stored(&self, record_name: &str, address: &str) -> Result<(), Error> {
        let path = self.path_for(record_name);
        let temp_path = self.temp_path_for(record_name);

        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(address.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("Stored address written: {}", path.display());
        Ok(())
    }
}
