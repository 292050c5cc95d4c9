//! Entry kinds and the cache key model.
//!
//! Keys are pure functions of the entry kind and hash. The one exception is
//! [`transform_action_cache_key`], which folds an instance name into Action
//! Cache keys so that several build instances can share one physical AC
//! namespace without seeing each other's entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ConfigError;
use crate::hashing::Hasher;

/// Namespace an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Action Cache: action fingerprint to result.
    Ac,
    /// Content Addressable Storage: content hash to bytes.
    Cas,
    /// Unvalidated entries, only reachable through the internal HTTP surface.
    Raw,
}

impl EntryKind {
    pub const ALL: [EntryKind; 3] = [EntryKind::Ac, EntryKind::Cas, EntryKind::Raw];

    /// Short name used in logical keys.
    pub fn name(self) -> &'static str {
        match self {
            EntryKind::Ac => "ac",
            EntryKind::Cas => "cas",
            EntryKind::Raw => "raw",
        }
    }

    /// Versioned directory name. Bump the suffix when the on-disk format
    /// changes so old data is never misread.
    pub fn dir_name(self) -> &'static str {
        match self {
            EntryKind::Ac => "ac.v2",
            EntryKind::Cas => "cas.v2",
            EntryKind::Raw => "raw.v2",
        }
    }

    /// Relative storage path of an entry:
    /// `<kind dir>/<hasher dir>/<first two hash chars>/<hash>`.
    pub fn blob_path(self, hasher: &dyn Hasher, hash: &str) -> String {
        let shard = hash.get(..2).unwrap_or(hash);
        format!("{}/{}/{}/{}", self.dir_name(), hasher.dir(), shard, hash)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntryKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "entry_kind".to_string(),
                value: s.to_string(),
                reason: "expected one of ac, cas, raw".to_string(),
            })
    }
}

/// Logical identifier of an entry, shared by caches and proxies.
pub fn lookup_key(kind: EntryKind, hash: &str) -> String {
    format!("{}/{}", kind.name(), hash)
}

/// Remap an Action Cache key into an instance's private key space.
///
/// An empty instance name leaves the key untouched. Otherwise the result is
/// `hex(sha256(key ++ instance))`. SHA-256 is fixed here regardless of the
/// digest function the instance negotiated, so two instances using
/// different algorithms still land in disjoint key spaces.
///
/// Only AC keys are remapped; CAS identity stays global.
pub fn transform_action_cache_key(key: &str, instance: &str) -> String {
    if instance.is_empty() {
        return key.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(instance.as_bytes());
    let derived = hex::encode(hasher.finalize());

    tracing::info!(key, instance, derived = %derived, "REMAP AC HASH");

    derived
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Property: distinct instances map the same key to distinct keys.
        #[test]
        fn prop_instances_do_not_collide(
            key in "[a-f0-9]{64}",
            i1 in "[a-z][a-z0-9-]{0,15}",
            i2 in "[a-z][a-z0-9-]{0,15}",
        ) {
            prop_assume!(i1 != i2);
            prop_assert_ne!(
                transform_action_cache_key(&key, &i1),
                transform_action_cache_key(&key, &i2)
            );
        }

        /// Property: remapped keys are valid SHA-256 hex digests.
        #[test]
        fn prop_transformed_key_is_sha256_hex(key in ".{0,80}", instance in ".{1,20}") {
            let derived = transform_action_cache_key(&key, &instance);
            prop_assert!(crate::hashing::sha256().validate(&derived).is_ok());
        }

        /// Property: the empty instance is the identity.
        #[test]
        fn prop_empty_instance_identity(key in ".{0,80}") {
            prop_assert_eq!(transform_action_cache_key(&key, ""), key);
        }
    }
}
