use thiserror::Error;

/// Unified error type for the entire asset-ledger-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage medium ──────────────────────────────────────────────
    /// The medium could not be opened or written (missing directory,
    /// permissions, quota). Fatal to initialization.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: wrong passphrase or corrupted file")]
    Decryption,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Schema migration ────────────────────────────────────────────
    /// A schema transition could not be completed. The medium is left at
    /// the last fully applied version.
    #[error("Migration from schema v{from} to v{to} failed: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },

    // ── Import / Export ─────────────────────────────────────────────
    #[error("Invalid backup format: {0}")]
    InvalidFormat(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Cannot modify {requested}: it is after the current month {current}")]
    FutureMonth { requested: String, current: String },

    #[error("Invalid year-month '{0}': expected YYYY-MM")]
    InvalidYearMonth(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::StorageUnavailable(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<aes_gcm::Error> for CoreError {
    fn from(_: aes_gcm::Error) -> Self {
        CoreError::Decryption
    }
}
