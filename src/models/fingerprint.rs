// src/models/fingerprint.rs
//! Document fingerprint type.
//!
//! A fingerprint is the fixed-length Keccak-256 digest of a document's bytes.
//! It is the sole key correlating local activity records with on-chain
//! credential entries, so both sides must agree on its canonical form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of bytes in a document fingerprint digest.
pub const FINGERPRINT_LEN: usize = 32;

/// A 32-byte content digest uniquely identifying a document.
///
/// The canonical text form is lowercase hex with a `0x` prefix; parsing also
/// accepts bare hex. Anything that does not decode to exactly 32 bytes is
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentFingerprint([u8; FINGERPRINT_LEN]);

impl DocumentFingerprint {
    /// Wraps a raw 32-byte digest.
    pub fn new(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        DocumentFingerprint(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> [u8; FINGERPRINT_LEN] {
        self.0
    }
}

/// Error returned when a fingerprint string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFingerprintError(String);

impl fmt::Display for ParseFingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fingerprint: {}", self.0)
    }
}

impl std::error::Error for ParseFingerprintError {}

impl FromStr for DocumentFingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s.strip_prefix("0x").unwrap_or(s);
        if hex_part.len() != FINGERPRINT_LEN * 2 {
            return Err(ParseFingerprintError(format!(
                "expected {} hex characters, got {}",
                FINGERPRINT_LEN * 2,
                hex_part.len()
            )));
        }
        let mut bytes = [0u8; FINGERPRINT_LEN];
        for (i, chunk) in hex_part.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| ParseFingerprintError("non-ASCII input".into()))?;
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| ParseFingerprintError(format!("non-hex characters in '{}'", pair)))?;
        }
        Ok(DocumentFingerprint(bytes))
    }
}

impl fmt::Display for DocumentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for DocumentFingerprint {
    type Error = ParseFingerprintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentFingerprint> for String {
    fn from(fp: DocumentFingerprint) -> String {
        fp.to_string()
    }
}
