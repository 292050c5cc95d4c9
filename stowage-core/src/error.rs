//! Error types for stowage operations

use crate::{DigestFunction, EntryKind};
use thiserror::Error;

/// Digest function and hash validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HashingError {
    #[error("unsupported digest function {function}")]
    UnsupportedDigestFunction { function: DigestFunction },

    #[error("unknown digest algorithm \"{name}\"")]
    UnknownAlgorithm { name: String },

    #[error("Invalid {algorithm} hash length {got}: expected {expected}")]
    InvalidLength {
        algorithm: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("Malformed {algorithm} hash {value}")]
    Malformed { algorithm: &'static str, value: String },

    #[error("Invalid zero-length {function} hash")]
    InvalidEmptyDigest { function: DigestFunction },

    #[error("digest function {function} or name \"{name}\" registered twice")]
    DuplicateRegistration {
        function: DigestFunction,
        name: String,
    },
}

/// Errors returned by cache and proxy backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("{kind} entry not found: {hash}")]
    NotFound { kind: EntryKind, hash: String },

    #[error("size mismatch for {hash}: expected {expected} bytes, read {actual}")]
    SizeMismatch {
        hash: String,
        expected: u64,
        actual: u64,
    },

    #[error("content hashes to {actual}, expected {expected}")]
    HashMismatch { expected: String, actual: String },

    /// Another writer is storing the same entry right now.
    #[error("concurrent write in progress for {key}")]
    ConcurrentWrite { key: String },

    /// Structured backend error; `code` is an HTTP status code.
    #[error("{text}")]
    Status { code: u16, text: String },

    #[error("I/O error: {reason}")]
    Io { reason: String },

    #[error("invalid digest: {0}")]
    Validation(#[from] HashingError),
}

impl CacheError {
    /// Errors a writer may ignore: the same bytes are landing anyway.
    pub fn is_benign(&self) -> bool {
        matches!(self, CacheError::ConcurrentWrite { .. })
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io {
            reason: err.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Asset service errors surfaced to the transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("{rpc} is not implemented")]
    Unimplemented { rpc: &'static str },
}

/// Master error type for all stowage errors.
#[derive(Debug, Clone, Error)]
pub enum StowageError {
    #[error("Hashing error: {0}")]
    Hashing(#[from] HashingError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type alias for stowage operations.
pub type StowageResult<T> = Result<T, StowageError>;

// =============================================================================
// TESTS
// =============================================================================
