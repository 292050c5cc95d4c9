//! Immutable registry of digest functions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{md5, sha1, sha256, sha384, sha512, Blake3Hasher, DigestFunction, Hasher};
use crate::error::HashingError;

/// Digest function used when a request leaves the field unset.
const DEFAULT_DIGEST_FUNCTION: DigestFunction = DigestFunction::Sha256;

/// Lookup table of hashers by wire id and by canonical name.
///
/// Built once at startup and never mutated afterwards, so it can be shared
/// behind an `Arc` and read concurrently without synchronization.
#[derive(Clone)]
pub struct HasherRegistry {
    by_id: HashMap<DigestFunction, Arc<dyn Hasher>>,
    by_name: HashMap<&'static str, DigestFunction>,
}

impl HasherRegistry {
    /// Start an empty registry.
    pub fn builder() -> HasherRegistryBuilder {
        HasherRegistryBuilder::default()
    }

    /// Registry with every built-in digest function.
    pub fn standard() -> Self {
        let builtins: [Arc<dyn Hasher>; 6] = [
            Arc::new(sha256()),
            Arc::new(sha1()),
            Arc::new(md5()),
            Arc::new(sha384()),
            Arc::new(sha512()),
            Arc::new(Blake3Hasher),
        ];

        let mut registry = Self {
            by_id: HashMap::with_capacity(builtins.len()),
            by_name: HashMap::with_capacity(builtins.len()),
        };
        for hasher in builtins {
            let previous = registry.by_name.insert(hasher.name(), hasher.digest_function());
            debug_assert!(previous.is_none(), "duplicate built-in name {}", hasher.name());
            registry.by_id.insert(hasher.digest_function(), hasher);
        }
        registry
    }

    /// Look up a hasher by wire id.
    ///
    /// `Unknown` resolves to the default (SHA-256) when it is registered.
    pub fn get(&self, function: DigestFunction) -> Result<Arc<dyn Hasher>, HashingError> {
        let function = match function {
            DigestFunction::Unknown => DEFAULT_DIGEST_FUNCTION,
            other => other,
        };
        self.by_id
            .get(&function)
            .cloned()
            .ok_or(HashingError::UnsupportedDigestFunction { function })
    }

    /// Look up a hasher by canonical name (`sha256`).
    pub fn get_by_name(&self, name: &str) -> Result<Arc<dyn Hasher>, HashingError> {
        match self.digest_function_by_name(name) {
            DigestFunction::Unknown => Err(HashingError::UnknownAlgorithm {
                name: name.to_string(),
            }),
            function => self.get(function),
        }
    }

    /// Map a canonical name to its wire id, or `Unknown` if nothing by that
    /// name is registered.
    pub fn digest_function_by_name(&self, name: &str) -> DigestFunction {
        self.by_name.get(name).copied().unwrap_or_default()
    }

    /// Whether a hasher with this canonical name is registered.
    pub fn is_supported(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Guess the digest function of a bare hex hash from its length.
    ///
    /// Only the classic lengths are recognised; BLAKE3 shares SHA-256's
    /// length and is never inferred.
    pub fn infer_from_hash(&self, hash: &str) -> Option<Arc<dyn Hasher>> {
        let function = match hash.len() {
            32 => DigestFunction::Md5,
            40 => DigestFunction::Sha1,
            64 => DigestFunction::Sha256,
            96 => DigestFunction::Sha384,
            128 => DigestFunction::Sha512,
            _ => return None,
        };
        self.by_id.get(&function).cloned()
    }

    /// Registered hashers, ordered by wire id.
    pub fn hashers(&self) -> Vec<Arc<dyn Hasher>> {
        let mut hashers: Vec<_> = self.by_id.values().cloned().collect();
        hashers.sort_by_key(|h| h.digest_function());
        hashers
    }

    /// Number of registered hashers.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for HasherRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for HasherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("HasherRegistry").field("names", &names).finish()
    }
}

/// Builder for a custom [`HasherRegistry`].
///
/// Registration is the only mutation a registry ever sees. A second hasher
/// with the same id or name is rejected so that wiring mistakes surface at
/// startup rather than on the request path.
#[derive(Default)]
pub struct HasherRegistryBuilder {
    by_id: HashMap<DigestFunction, Arc<dyn Hasher>>,
    by_name: HashMap<&'static str, DigestFunction>,
}

impl HasherRegistryBuilder {
    pub fn register(mut self, hasher: Arc<dyn Hasher>) -> Result<Self, HashingError> {
        let function = hasher.digest_function();
        let name = hasher.name();
        if function == DigestFunction::Unknown
            || self.by_id.contains_key(&function)
            || self.by_name.contains_key(name)
        {
            return Err(HashingError::DuplicateRegistration {
                function,
                name: name.to_string(),
            });
        }
        self.by_name.insert(name, function);
        self.by_id.insert(function, hasher);
        Ok(self)
    }

    pub fn build(self) -> HasherRegistry {
        HasherRegistry {
            by_id: self.by_id,
            by_name: self.by_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registers_every_function() {
        let registry = HasherRegistry::standard();
        assert_eq!(registry.len(), DigestFunction::ALL.len());
        for function in DigestFunction::ALL {
            let hasher = registry.get(function).expect("registered");
            assert_eq!(hasher.digest_function(), function);
            assert_eq!(registry.digest_function_by_name(hasher.name()), function);
        }
    }

    #[test]
    fn test_unknown_resolves_to_default() {
        let registry = HasherRegistry::standard();
        let hasher = registry.get(DigestFunction::Unknown).expect("default");
        assert_eq!(hasher.digest_function(), DigestFunction::Sha256);
    }

    #[test]
    fn test_unregistered_function_is_an_error() {
        let registry = HasherRegistry::builder()
            .register(Arc::new(sha256()))
            .expect("register")
            .build();
        let err = registry.get(DigestFunction::Sha512).unwrap_err();
        assert_eq!(
            err,
            HashingError::UnsupportedDigestFunction {
                function: DigestFunction::Sha512
            }
        );
        assert!(err.to_string().contains("unsupported digest function"));
    }

    #[test]
    fn test_name_lookup() {
        let registry = HasherRegistry::standard();
        assert_eq!(registry.digest_function_by_name("sha256"), DigestFunction::Sha256);
        assert_eq!(registry.digest_function_by_name("sha384"), DigestFunction::Sha384);
        assert_eq!(registry.digest_function_by_name("SHA256"), DigestFunction::Unknown);
        assert_eq!(registry.digest_function_by_name("crc32"), DigestFunction::Unknown);
        assert!(registry.is_supported("md5"));
        assert!(!registry.is_supported("crc32"));
        assert!(registry.get_by_name("crc32").is_err());
        assert_eq!(
            registry.get_by_name("blake3").expect("blake3").digest_function(),
            DigestFunction::Blake3
        );
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = HasherRegistry::builder()
            .register(Arc::new(sha256()))
            .and_then(|b| b.register(Arc::new(sha256())));
        assert!(matches!(
            result,
            Err(HashingError::DuplicateRegistration {
                function: DigestFunction::Sha256,
                ..
            })
        ));
    }

    #[test]
    fn test_infer_from_hash_length() {
        let registry = HasherRegistry::standard();
        let infer = |len: usize| {
            registry
                .infer_from_hash(&"a".repeat(len))
                .map(|h| h.digest_function())
        };
        assert_eq!(infer(32), Some(DigestFunction::Md5));
        assert_eq!(infer(40), Some(DigestFunction::Sha1));
        assert_eq!(infer(64), Some(DigestFunction::Sha256));
        assert_eq!(infer(96), Some(DigestFunction::Sha384));
        assert_eq!(infer(128), Some(DigestFunction::Sha512));
        assert_eq!(infer(10), None);
    }

    #[test]
    fn test_hashers_sorted_by_id() {
        let ids: Vec<_> = HasherRegistry::standard()
            .hashers()
            .iter()
            .map(|h| h.digest_function().as_i32())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 5, 6, 9]);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Property: every registered hasher accepts its own output.
        #[test]
        fn prop_hash_output_validates(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            for hasher in HasherRegistry::standard().hashers() {
                let hash = hasher.hash(&data);
                prop_assert!(hasher.validate(&hash).is_ok(), "{} rejected its own hash", hasher.name());
                prop_assert_eq!(hash.len(), hasher.size() * 2);
            }
        }

        /// Property: streaming in arbitrary chunks matches the one-shot hash.
        #[test]
        fn prop_stream_matches_one_shot(
            data in proptest::collection::vec(any::<u8>(), 0..512),
            split in 0usize..512,
        ) {
            let split = split.min(data.len());
            for hasher in HasherRegistry::standard().hashers() {
                let mut stream = hasher.stream();
                stream.update(&data[..split]);
                stream.update(&data[split..]);
                prop_assert_eq!(stream.finalize_hex(), hasher.hash(&data));
            }
        }

        /// Property: a zero size only accepts the canonical empty digest.
        #[test]
        fn prop_zero_size_requires_empty_digest(data in proptest::collection::vec(any::<u8>(), 1..256)) {
            for hasher in HasherRegistry::standard().hashers() {
                prop_assert!(hasher.validate_digest(hasher.empty(), 0).is_ok());
                let other = hasher.hash(&data);
                prop_assert!(hasher.validate_digest(&other, 0).is_err());
                prop_assert!(hasher.validate_digest(&other, data.len() as u64).is_ok());
            }
        }
    }

    #[test]
    fn test_empty_constants_are_hashes_of_nothing() {
        for hasher in HasherRegistry::standard().hashers() {
            assert_eq!(hasher.hash(&[]), hasher.empty(), "{}", hasher.name());
            assert!(hasher.is_empty_hash(hasher.empty()));
        }
    }
}
