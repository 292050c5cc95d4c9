//! Wire types of the remote asset Fetch service.
//!
//! Field names and status codes follow the Remote Asset API. Qualifier
//! entries are optional so that a null element coming off the wire can be
//! represented and rejected explicitly.

use serde::{Deserialize, Serialize};
use stowage_core::{AssetError, DigestFunction};

/// Qualifier carrying a Subresource Integrity checksum.
pub const CHECKSUM_SRI: &str = "checksum.sri";

/// A typed hint narrowing how an asset may be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifier {
    pub name: String,
    pub value: String,
}

impl Qualifier {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A `checksum.sri` qualifier.
    pub fn checksum_sri(value: impl Into<String>) -> Self {
        Self::new(CHECKSUM_SRI, value)
    }
}

/// Request to resolve a blob by qualifiers and/or candidate URIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchBlobRequest {
    /// Digest function the caller wants the result expressed in.
    pub digest_function: DigestFunction,
    /// Tried in order; the first cache hit wins.
    pub qualifiers: Vec<Option<Qualifier>>,
    /// Tried in order after the qualifiers; the first successful fetch wins.
    pub uris: Vec<String>,
}

impl FetchBlobRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_digest_function(mut self, digest_function: DigestFunction) -> Self {
        self.digest_function = digest_function;
        self
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(Some(qualifier));
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uris.push(uri.into());
        self
    }
}

/// Status codes used by the Fetch service (gRPC numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum Code {
    #[default]
    Ok = 0,
    InvalidArgument = 3,
    NotFound = 5,
    Unimplemented = 12,
}

/// Status embedded in a response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: Code,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            code: Code::InvalidArgument,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            code: Code::NotFound,
            message: String::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }
}

/// Map a call-level error onto the status a transport should report.
impl From<&AssetError> for Status {
    fn from(err: &AssetError) -> Self {
        let code = match err {
            AssetError::InvalidArgument { .. } => Code::InvalidArgument,
            AssetError::Unimplemented { .. } => Code::Unimplemented,
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}

/// Content digest: hex hash plus size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobDigest {
    pub hash: String,
    pub size_bytes: i64,
}

impl BlobDigest {
    pub fn new(hash: impl Into<String>, size: u64) -> Self {
        Self {
            hash: hash.into(),
            size_bytes: i64::try_from(size).unwrap_or(i64::MAX),
        }
    }
}

/// Result of a FetchBlob call.
///
/// Failures to resolve are reported through `status`, not as call errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchBlobResponse {
    pub status: Status,
    pub digest_function: DigestFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_digest: Option<BlobDigest>,
    /// URI the blob was fetched from, when it did not come from the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl FetchBlobResponse {
    pub fn found(digest_function: DigestFunction, digest: BlobDigest, uri: Option<String>) -> Self {
        Self {
            status: Status::ok(),
            digest_function,
            blob_digest: Some(digest),
            uri,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            status: Status::invalid_argument(message),
            ..Default::default()
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: Status::not_found(),
            ..Default::default()
        }
    }
}

/// Request to resolve a directory tree. Not served by this layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchDirectoryRequest {
    pub digest_function: DigestFunction,
    pub qualifiers: Vec<Option<Qualifier>>,
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchDirectoryResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_directory_digest: Option<BlobDigest>,
}
