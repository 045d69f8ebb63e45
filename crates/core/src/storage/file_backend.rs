use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::backend::StorageBackend;
use super::database::Database;
use super::encryption::{KdfParams, SealingKey};
use super::format::{self, ContainerHeader, FORMAT_VERSION};
use crate::errors::CoreError;

/// One encrypted container file on disk.
///
/// Flow on write: Database → bincode → AES-256-GCM(Argon2id(passphrase)) →
/// container bytes → temp file → fsync → rename over the target. A crash
/// mid-write leaves the previous file in place.
pub struct FileBackend {
    path: PathBuf,
    key: SealingKey,
    /// Database decrypted during `open`, handed out by the first `load`.
    opened: Option<Database>,
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("path", &self.path)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl FileBackend {
    /// Open (or prepare to create) the container at `path`.
    ///
    /// An existing file is decrypted with `passphrase` using the KDF
    /// parameters stored in its header; `kdf_params` only applies to new
    /// files. The key is derived once here and reused for every write.
    pub fn open(path: impl Into<PathBuf>, passphrase: &str, kdf_params: KdfParams) -> Result<Self, CoreError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(CoreError::StorageUnavailable(format!(
                    "Directory {} does not exist",
                    parent.display()
                )));
            }
        }

        if !path.exists() {
            log::info!("Creating new ledger container at {}", path.display());
            let key = SealingKey::generate(passphrase, kdf_params)?;
            return Ok(Self {
                path,
                key,
                opened: None,
            });
        }

        let bytes = fs::read(&path).map_err(|e| {
            CoreError::StorageUnavailable(format!("Cannot read {}: {e}", path.display()))
        })?;
        let (header, ciphertext) = format::read_container(&bytes)?;
        let key = SealingKey::derive(passphrase, header.salt, header.kdf_params)?;
        let plaintext = key.open(&header.nonce, ciphertext)?;
        let db: Database = bincode::deserialize(&plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Failed to decode ledger database: {e}")))?;

        if db.version != header.schema_version {
            return Err(CoreError::InvalidFileFormat(format!(
                "Header declares schema v{} but payload is v{}",
                header.schema_version, db.version
            )));
        }

        log::debug!(
            "Opened {} (schema v{}, {} tables)",
            path.display(),
            db.version,
            db.table_names().len()
        );

        Ok(Self {
            path,
            key,
            opened: Some(db),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_atomically(&self, bytes: &[u8]) -> std::io::Result<()> {
        let temp = self.temp_path();
        {
            let mut file = File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&mut self) -> Result<Option<Database>, CoreError> {
        if let Some(db) = self.opened.take() {
            return Ok(Some(db));
        }
        if !self.path.exists() {
            return Ok(None);
        }
        // Already-consumed open: re-read what is on disk.
        let bytes = fs::read(&self.path)?;
        let (header, ciphertext) = format::read_container(&bytes)?;
        if header.salt != *self.key.salt() {
            return Err(CoreError::InvalidFileFormat(format!(
                "{} was replaced by another writer",
                self.path.display()
            )));
        }
        let plaintext = self.key.open(&header.nonce, ciphertext)?;
        let db = bincode::deserialize(&plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Failed to decode ledger database: {e}")))?;
        Ok(Some(db))
    }

    fn persist(&mut self, db: &Database) -> Result<(), CoreError> {
        let plaintext = bincode::serialize(db)
            .map_err(|e| CoreError::Serialization(format!("Failed to encode ledger database: {e}")))?;
        let (nonce, ciphertext) = self.key.seal(&plaintext)?;

        let header = ContainerHeader {
            format_version: FORMAT_VERSION,
            schema_version: db.version,
            kdf_params: *self.key.params(),
            salt: *self.key.salt(),
            nonce,
            ciphertext_len: ciphertext.len() as u64,
        };
        let bytes = format::write_container(&header, &ciphertext);

        self.write_atomically(&bytes).map_err(|e| {
            CoreError::StorageUnavailable(format!("Cannot write {}: {e}", self.path.display()))
        })
    }
}
