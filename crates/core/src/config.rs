use std::path::PathBuf;

use crate::storage::encryption::KdfParams;

/// Default container file name.
pub const DEFAULT_FILE_NAME: &str = "asset-ledger.aldb";

/// Default import ceiling: 5 MiB.
pub const DEFAULT_MAX_IMPORT_BYTES: usize = 5 * 1024 * 1024;

/// How and where a ledger is stored.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Location of the encrypted container file
    pub path: PathBuf,

    /// Key-derivation cost for newly created files. Existing files always
    /// reopen with the parameters recorded in their header.
    pub kdf_params: KdfParams,

    /// Largest backup document collaborators should hand to the importer
    pub max_import_bytes: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_FILE_NAME),
            kdf_params: KdfParams::default(),
            max_import_bytes: DEFAULT_MAX_IMPORT_BYTES,
        }
    }
}

impl LedgerConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_kdf_params(mut self, kdf_params: KdfParams) -> Self {
        self.kdf_params = kdf_params;
        self
    }

    #[must_use]
    pub fn with_max_import_bytes(mut self, max: usize) -> Self {
        self.max_import_bytes = max;
        self
    }
}
