//! Digest functions and the hasher registry.
//!
//! Every algorithm the cache understands is a [`Hasher`]: an identity on the
//! wire ([`DigestFunction`]), a canonical name, a streaming accumulator, a
//! one-shot hash, a storage directory and the validation rules for its hex
//! digests. Hashers are collected once at startup into an immutable
//! [`HasherRegistry`] that is handed to whoever needs it.

mod blake3;
mod registry;
mod rustcrypto;

pub use self::blake3::Blake3Hasher;
pub use registry::{HasherRegistry, HasherRegistryBuilder};
pub use rustcrypto::{md5, sha1, sha256, sha384, sha512, RustCryptoHasher};

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::HashingError;

static LOWER_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-f0-9]+$").expect("Invalid lowercase hex regex"));

// ============================================================================
// DIGEST FUNCTION IDS
// ============================================================================

/// Stable wire identifier of a digest function.
///
/// Discriminants follow the Remote Execution API `DigestFunction.Value` enum.
/// `Unknown` is the zero value: an unset field on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum DigestFunction {
    #[default]
    Unknown = 0,
    Sha256 = 1,
    Sha1 = 2,
    Md5 = 3,
    Sha384 = 5,
    Sha512 = 6,
    Blake3 = 9,
}

impl DigestFunction {
    /// All known ids, `Unknown` excluded.
    pub const ALL: [DigestFunction; 6] = [
        DigestFunction::Sha256,
        DigestFunction::Sha1,
        DigestFunction::Md5,
        DigestFunction::Sha384,
        DigestFunction::Sha512,
        DigestFunction::Blake3,
    ];

    /// Numeric wire value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Map a numeric wire value back to an id.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(DigestFunction::Unknown),
            1 => Some(DigestFunction::Sha256),
            2 => Some(DigestFunction::Sha1),
            3 => Some(DigestFunction::Md5),
            5 => Some(DigestFunction::Sha384),
            6 => Some(DigestFunction::Sha512),
            9 => Some(DigestFunction::Blake3),
            _ => None,
        }
    }

    fn wire_name(self) -> &'static str {
        match self {
            DigestFunction::Unknown => "UNKNOWN",
            DigestFunction::Sha256 => "SHA256",
            DigestFunction::Sha1 => "SHA1",
            DigestFunction::Md5 => "MD5",
            DigestFunction::Sha384 => "SHA384",
            DigestFunction::Sha512 => "SHA512",
            DigestFunction::Blake3 => "BLAKE3",
        }
    }
}

impl fmt::Display for DigestFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for DigestFunction {
    type Err = HashingError;

    /// Parses the wire name (`SHA256`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        std::iter::once(DigestFunction::Unknown)
            .chain(DigestFunction::ALL)
            .find(|df| df.wire_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| HashingError::UnknownAlgorithm {
                name: s.to_string(),
            })
    }
}

// ============================================================================
// HASHER CAPABILITY
// ============================================================================

/// Incremental hash accumulator produced by [`Hasher::stream`].
pub trait HashStream: Send {
    /// Feed more bytes into the accumulator.
    fn update(&mut self, data: &[u8]);

    /// Consume the accumulator and return the lowercase hex digest.
    fn finalize_hex(self: Box<Self>) -> String;
}

/// A digest function implementation.
///
/// Implementations are stateless; all per-computation state lives in the
/// [`HashStream`] they hand out.
pub trait Hasher: Send + Sync + fmt::Debug {
    /// Wire identifier.
    fn digest_function(&self) -> DigestFunction;

    /// Canonical lowercase name, as used in SRI strings (`sha256`).
    fn name(&self) -> &'static str;

    /// A fresh streaming accumulator.
    fn stream(&self) -> Box<dyn HashStream>;

    /// Digest of the zero-length input.
    fn empty(&self) -> &'static str;

    /// Raw digest length in bytes. Hex digests are twice as long.
    fn size(&self) -> usize;

    /// One-shot lowercase hex digest of `data`.
    fn hash(&self, data: &[u8]) -> String {
        let mut stream = self.stream();
        stream.update(data);
        stream.finalize_hex()
    }

    /// Storage subdirectory for this algorithm's namespace.
    fn dir(&self) -> &'static str {
        self.name()
    }

    /// Check that `value` is a well-formed hex digest for this algorithm.
    fn validate(&self, value: &str) -> Result<(), HashingError> {
        validate_hex(self.name(), self.size(), value)
    }

    /// Like [`Hasher::validate`], but a zero `size` only accepts the
    /// canonical empty digest.
    fn validate_digest(&self, hash: &str, size: u64) -> Result<(), HashingError> {
        if size == 0 {
            if self.is_empty_hash(hash) {
                return Ok(());
            }
            return Err(HashingError::InvalidEmptyDigest {
                function: self.digest_function(),
            });
        }
        self.validate(hash)
    }

    /// Whether `hash` is the digest of the empty input.
    fn is_empty_hash(&self, hash: &str) -> bool {
        hash == self.empty()
    }
}

/// Shared length and character-class check for hex digests.
pub(crate) fn validate_hex(name: &'static str, size: usize, value: &str) -> Result<(), HashingError> {
    let expected = size * 2;
    if value.len() != expected {
        return Err(HashingError::InvalidLength {
            algorithm: name,
            got: value.len(),
            expected,
        });
    }
    if !LOWER_HEX.is_match(value) {
        return Err(HashingError::Malformed {
            algorithm: name,
            value: value.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_function_wire_values() {
        assert_eq!(DigestFunction::Unknown.as_i32(), 0);
        assert_eq!(DigestFunction::Sha256.as_i32(), 1);
        assert_eq!(DigestFunction::Sha384.as_i32(), 5);
        assert_eq!(DigestFunction::Blake3.as_i32(), 9);

        for df in DigestFunction::ALL {
            assert_eq!(DigestFunction::from_i32(df.as_i32()), Some(df));
        }
        assert_eq!(DigestFunction::from_i32(4), None);
        assert_eq!(DigestFunction::from_i32(-1), None);
    }

    #[test]
    fn test_digest_function_display_and_parse() {
        assert_eq!(DigestFunction::Sha512.to_string(), "SHA512");
        assert_eq!("sha512".parse::<DigestFunction>().ok(), Some(DigestFunction::Sha512));
        assert_eq!("UNKNOWN".parse::<DigestFunction>().ok(), Some(DigestFunction::Unknown));
        assert!("whirlpool".parse::<DigestFunction>().is_err());
    }

    #[test]
    fn test_digest_function_serde_uses_wire_names() {
        let json = serde_json::to_string(&DigestFunction::Sha256).expect("serialize");
        assert_eq!(json, "\"SHA256\"");
        let back: DigestFunction = serde_json::from_str("\"BLAKE3\"").expect("deserialize");
        assert_eq!(back, DigestFunction::Blake3);
    }

    #[test]
    fn test_validate_hex_rejects_uppercase() {
        let upper = "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855";
        let err = validate_hex("sha256", 32, upper).unwrap_err();
        assert!(matches!(err, HashingError::Malformed { .. }));
    }

    #[test]
    fn test_validate_hex_reports_lengths() {
        let err = validate_hex("sha384", 48, "abcd").unwrap_err();
        assert_eq!(
            err,
            HashingError::InvalidLength {
                algorithm: "sha384",
                got: 4,
                expected: 96,
            }
        );
        assert!(err.to_string().contains("96"));
    }
}
