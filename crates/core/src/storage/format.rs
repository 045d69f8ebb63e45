use super::encryption::KdfParams;
use crate::errors::CoreError;

/// Magic bytes identifying an asset ledger container file.
pub const MAGIC: &[u8; 4] = b"ALDB";

/// Current container layout version. Independent of the schema version of
/// the tables inside it.
pub const FORMAT_VERSION: u16 = 1;

/// magic(4) + format(2) + schema(4) + kdf_params(12) + salt(16) + nonce(12) + ciphertext_len(8) = 58
pub const HEADER_SIZE: usize = 58;

/// Header of a container file. Readable without the passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub format_version: u16,
    pub schema_version: u32,
    pub kdf_params: KdfParams,
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
    pub ciphertext_len: u64,
}

/// Assemble a container.
///
/// Layout:
/// ```text
/// [ALDB: 4B] [format version: 2B LE] [schema version: 4B LE]
/// [memory_cost: 4B LE] [time_cost: 4B LE] [parallelism: 4B LE]
/// [salt: 16B] [nonce: 12B] [ciphertext_len: 8B LE] [ciphertext]
/// ```
pub fn write_container(header: &ContainerHeader, ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&header.format_version.to_le_bytes());
    buf.extend_from_slice(&header.schema_version.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.memory_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.time_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.parallelism.to_le_bytes());
    buf.extend_from_slice(&header.salt);
    buf.extend_from_slice(&header.nonce);
    buf.extend_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    buf.extend_from_slice(ciphertext);
    buf
}

/// Parse the header and return it with the ciphertext slice.
pub fn read_container(data: &[u8]) -> Result<(ContainerHeader, &[u8]), CoreError> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(
            "File too small to be an asset ledger container".into(),
        ));
    }
    if &data[0..4] != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes, not an asset ledger container".into(),
        ));
    }

    let mut reader = HeaderReader { data, offset: 4 };

    let format_version = u16::from_le_bytes(reader.take::<2>());
    if format_version == 0 || format_version > FORMAT_VERSION {
        return Err(CoreError::UnsupportedVersion(u32::from(format_version)));
    }

    let schema_version = u32::from_le_bytes(reader.take::<4>());
    let kdf_params = KdfParams {
        memory_cost: u32::from_le_bytes(reader.take::<4>()),
        time_cost: u32::from_le_bytes(reader.take::<4>()),
        parallelism: u32::from_le_bytes(reader.take::<4>()),
    };
    kdf_params.validate()?;

    let salt = reader.take::<16>();
    let nonce = reader.take::<12>();
    let ciphertext_len = u64::from_le_bytes(reader.take::<8>());

    let start = reader.offset;
    let available = (data.len() - start) as u64;
    if available < ciphertext_len {
        return Err(CoreError::InvalidFileFormat(format!(
            "File truncated: expected {ciphertext_len} bytes of ciphertext, got {available}"
        )));
    }
    let end = start + ciphertext_len as usize;

    let header = ContainerHeader {
        format_version,
        schema_version,
        kdf_params,
        salt,
        nonce,
        ciphertext_len,
    };

    Ok((header, &data[start..end]))
}

/// Schema version recorded in a container, without decrypting it.
pub fn peek_schema_version(data: &[u8]) -> Result<u32, CoreError> {
    read_container(data).map(|(header, _)| header.schema_version)
}

/// Fixed-size reads over a buffer already checked to hold `HEADER_SIZE` bytes.
struct HeaderReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl HeaderReader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        out
    }
}
