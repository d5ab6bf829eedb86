//! SHA-256 digests of files and command lines.

use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Length of the abbreviated digests used in paths and fingerprints.
pub const SHORT_DIGEST_LEN: usize = 16;

/// Hex SHA-256 of a string.
pub fn digest_str(s: &str) -> String {
    hex::encode(Sha256::digest(s.as_bytes()))
}

/// Abbreviated hex SHA-256 of a string.
pub fn short_digest(s: &str) -> String {
    let mut digest = digest_str(s);
    digest.truncate(SHORT_DIGEST_LEN);
    digest
}

/// Hex SHA-256 of a file's contents, streamed.
pub fn digest_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {} for hashing", path.display()))?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("failed to read {} for hashing", path.display()))?;

    Ok(hex::encode(hasher.finalize()))
}

/// Hashes a sequence of fields; field boundaries are part of the digest.
#[derive(Default)]
pub struct FieldHasher {
    hasher: Sha256,
}

impl FieldHasher {
    pub fn new() -> Self {
        FieldHasher::default()
    }

    pub fn field(&mut self, value: &str) -> &mut Self {
        self.hasher.update(value.as_bytes());
        self.hasher.update([0u8]);
        self
    }

    pub fn fields<'a>(&mut self, values: impl IntoIterator<Item = &'a str>) -> &mut Self {
        for value in values {
            self.field(value);
        }
        self
    }

    /// Abbreviated hex digest of everything hashed so far.
    pub fn finish_short(self) -> String {
        let mut digest = hex::encode(self.hasher.finalize());
        digest.truncate(SHORT_DIGEST_LEN);
        digest
    }
}
