use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::FabricaResult;

/// SHA-256 digest of a table or backup artifact
///
/// Recorded in collection audit metadata and compared against the
/// checksums a backup annotation may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: String,
    pub value: String,
}

impl Checksum {
    pub fn from_file<P: AsRef<Path>>(path: P) -> FabricaResult<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];

        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self {
            algorithm: "SHA-256".to_string(),
            value: hex::encode(hasher.finalize()),
        })
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self {
            algorithm: "SHA-256".to_string(),
            value: hex::encode(hasher.finalize()),
        }
    }

    /// Compare against a recorded hex digest, case-insensitively
    pub fn matches_hex(&self, expected: &str) -> bool {
        self.value.eq_ignore_ascii_case(expected.trim())
    }

    /// Recompute the file's digest and compare with this one
    pub fn verify<P: AsRef<Path>>(&self, path: P) -> FabricaResult<bool> {
        let computed = Self::from_file(path)?;
        Ok(computed.value == self.value)
    }
}
