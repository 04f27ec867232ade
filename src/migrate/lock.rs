//! Content-addressed migration skip detection.

use std::path::Path;

use sha2::{Digest, Sha256};

/// SHA-256 digest of a schema text, persisted as raw bytes to decide whether
/// the migration engine needs to run at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDigest([u8; 32]);

impl SchemaDigest {
    /// Digest the raw schema bytes.
    pub fn of(schema: &str) -> Self {
        Self(Sha256::digest(schema.as_bytes()).into())
    }

    /// Compare against the digest persisted at `path`.
    ///
    /// A missing or unreadable file means "no prior digest", never an error.
    pub fn matches_persisted(&self, path: &Path) -> bool {
        match std::fs::read(path) {
            Ok(prior) => prior == self.0,
            Err(_) => false,
        }
    }

    /// Persist the digest bytes at `path`.
    pub fn persist(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.0)
    }
}
