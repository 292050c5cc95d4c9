//! Subresource Integrity checksum strings.
//!
//! Format: `<algorithm>-<standard base64 of the raw digest>`, e.g.
//! `sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SriError {
    #[error("missing '-' between algorithm and digest in \"{value}\"")]
    MissingSeparator { value: String },

    #[error("failed to base64 decode \"{digest}\": {reason}")]
    Base64 { digest: String, reason: String },

    #[error("\"{value}\" is not a hex digest: {reason}")]
    Hex { value: String, reason: String },
}

/// A parsed SRI checksum with the digest re-encoded as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sri {
    pub algorithm: String,
    pub hex: String,
}

impl Sri {
    /// Split on the first `-` and decode the base64 remainder.
    pub fn parse(value: &str) -> Result<Self, SriError> {
        let (algorithm, digest) =
            value
                .split_once('-')
                .ok_or_else(|| SriError::MissingSeparator {
                    value: value.to_string(),
                })?;

        let raw = STANDARD.decode(digest).map_err(|e| SriError::Base64 {
            digest: digest.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            algorithm: algorithm.to_string(),
            hex: hex::encode(raw),
        })
    }

    /// Build the SRI string for a hex digest.
    pub fn encode(algorithm: &str, hex_digest: &str) -> Result<String, SriError> {
        let raw = hex::decode(hex_digest).map_err(|e| SriError::Hex {
            value: hex_digest.to_string(),
            reason: e.to_string(),
        })?;
        Ok(format!("{}-{}", algorithm, STANDARD.encode(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_value() {
        let sri = Sri::parse("sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=").expect("parse");
        assert_eq!(sri.algorithm, "sha256");
        assert_eq!(
            sri.hex,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_splits_on_first_dash_only() {
        let err = Sri::parse("sha256-abc-def").unwrap_err();
        assert!(matches!(err, SriError::Base64 { ref digest, .. } if digest == "abc-def"));
    }

    #[test]
    fn test_missing_separator() {
        assert_eq!(
            Sri::parse("sha256").unwrap_err(),
            SriError::MissingSeparator {
                value: "sha256".to_string()
            }
        );
    }

    #[test]
    fn test_bad_base64() {
        assert!(matches!(
            Sri::parse("sha256-!!!not base64!!!"),
            Err(SriError::Base64 { .. })
        ));
    }

    #[test]
    fn test_encode() {
        let sri = Sri::encode(
            "sha256",
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        )
        .expect("encode");
        assert_eq!(sri, "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
        assert!(Sri::encode("sha256", "xyz").is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: any raw digest survives encode-then-parse as the same hex.
        #[test]
        fn prop_encode_parse(raw in proptest::collection::vec(any::<u8>(), 1..64)) {
            let hex_digest = hex::encode(&raw);
            let sri = Sri::encode("sha512", &hex_digest).expect("encode");
            let parsed = Sri::parse(&sri).expect("parse");
            prop_assert_eq!(parsed.algorithm, "sha512");
            prop_assert_eq!(parsed.hex, hex_digest);
        }
    }
}
