//! FetchBlob resolution.
//!
//! A request is resolved by trying its `checksum.sri` qualifiers against the
//! CAS, then its URIs over HTTP, in the order given. Each candidate either
//! hits or is skipped with a reason; the first hit wins. Only a missing
//! request is a call error. Everything else is reported in the response
//! status.

use std::io::Cursor;
use std::sync::Arc;

use reqwest::Url;
use stowage_core::{AssetError, CacheError, EntryKind, Hasher, HasherRegistry, HashingError};
use stowage_storage::{BlobCache, BlobReader, BlobSize};
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::config::AssetConfig;
use crate::fetch::{FetchError, UriFetcher};
use crate::sri::{Sri, SriError};
use crate::types::{
    BlobDigest, FetchBlobRequest, FetchBlobResponse, FetchDirectoryRequest,
    FetchDirectoryResponse, CHECKSUM_SRI,
};

const NIL_QUALIFIER: &str = "unexpected nil qualifier in FetchBlobRequest";

/// Outcome of trying one candidate.
#[derive(Debug)]
enum Attempt<T> {
    Hit(T),
    Skip(SkipReason),
}

/// Why a qualifier or URI did not resolve the request.
#[derive(Debug, Error)]
enum SkipReason {
    #[error(transparent)]
    Sri(#[from] SriError),

    #[error(transparent)]
    Hashing(#[from] HashingError),

    #[error("not in CAS")]
    Miss,

    #[error("present but size unavailable: {0}")]
    UnknownSize(String),

    #[error("unable to parse URI: {0}")]
    InvalidUri(String),

    #[error("unsupported URI scheme \"{0}\"")]
    UnsupportedScheme(String),

    #[error("no digest function available to hash the download")]
    NoHasher,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("body exceeds buffer limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("read {actual} bytes, server declared {declared}")]
    Truncated { declared: u64, actual: u64 },

    #[error("failed to read data: {0}")]
    Read(String),

    #[error("URI data has hash {actual}, expected {expected}")]
    HashMismatch { expected: String, actual: String },

    #[error("failed to put {hash}: {source}")]
    Put { hash: String, source: CacheError },
}

impl SkipReason {
    /// Content that does not match its declared digest.
    fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            SkipReason::HashMismatch { .. }
                | SkipReason::Put {
                    source: CacheError::HashMismatch { .. },
                    ..
                }
        )
    }
}

/// A digest named by a qualifier that was valid but not served from cache.
struct Expected {
    hasher: Arc<dyn Hasher>,
    hash: String,
}

/// Resolves FetchBlob requests against a [`BlobCache`] and the network.
///
/// Holds no per-request state; share one instance across tasks.
pub struct AssetResolver<C, F> {
    registry: Arc<HasherRegistry>,
    cache: Arc<C>,
    fetcher: Arc<F>,
    config: AssetConfig,
}

impl<C, F> AssetResolver<C, F>
where
    C: BlobCache,
    F: UriFetcher,
{
    pub fn new(
        registry: Arc<HasherRegistry>,
        cache: Arc<C>,
        fetcher: Arc<F>,
        config: AssetConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    pub async fn fetch_blob(
        &self,
        request: Option<FetchBlobRequest>,
    ) -> Result<FetchBlobResponse, AssetError> {
        let request = request.ok_or_else(|| AssetError::InvalidArgument {
            reason: "expected a non-nil FetchBlobRequest".to_string(),
        })?;

        if request.qualifiers.iter().any(Option::is_none) {
            return Ok(FetchBlobResponse::invalid_argument(NIL_QUALIFIER));
        }

        let hasher = match self.registry.get(request.digest_function) {
            Ok(hasher) => Some(hasher),
            Err(e) => {
                tracing::warn!(
                    digest_function = %request.digest_function,
                    error = %e,
                    "unknown digest function"
                );
                None
            }
        };
        let mut expected: Option<Expected> = None;

        for qualifier in request.qualifiers.iter().flatten() {
            if qualifier.name != CHECKSUM_SRI {
                continue;
            }

            let (candidate, hash) = match self.parse_checksum(&qualifier.value) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    tracing::warn!(value = %qualifier.value, reason = %reason, "skipping checksum.sri qualifier");
                    continue;
                }
            };

            match self.lookup_cas(candidate.as_ref(), &hash).await {
                Attempt::Hit(size) => {
                    tracing::debug!(hash = %hash, size, "checksum.sri resolved from CAS");
                    return Ok(FetchBlobResponse::found(
                        candidate.digest_function(),
                        BlobDigest::new(hash, size),
                        None,
                    ));
                }
                Attempt::Skip(SkipReason::Miss) => {}
                Attempt::Skip(reason) => {
                    tracing::warn!(hash = %hash, reason = %reason, "CAS lookup failed");
                }
            }

            expected = Some(Expected {
                hasher: candidate,
                hash,
            });
        }

        for uri in &request.uris {
            let attempt = match (&expected, &hasher) {
                (Some(exp), _) => self.fetch_uri(exp.hasher.as_ref(), uri, Some(&exp.hash)).await,
                (None, Some(h)) => self.fetch_uri(h.as_ref(), uri, None).await,
                (None, None) => Attempt::Skip(SkipReason::NoHasher),
            };

            match attempt {
                Attempt::Hit((function, digest)) => {
                    return Ok(FetchBlobResponse::found(function, digest, Some(uri.clone())));
                }
                Attempt::Skip(reason) if reason.is_integrity_failure() => {
                    tracing::error!(uri = %uri, reason = %reason, "rejected download");
                }
                Attempt::Skip(reason) => {
                    tracing::warn!(uri = %uri, reason = %reason, "skipping URI");
                }
            }
        }

        Ok(FetchBlobResponse::not_found())
    }

    /// Directory resolution is not served.
    pub async fn fetch_directory(
        &self,
        _request: Option<FetchDirectoryRequest>,
    ) -> Result<FetchDirectoryResponse, AssetError> {
        Err(AssetError::Unimplemented {
            rpc: "FetchDirectory",
        })
    }

    /// Decode an SRI value into a registered hasher and a validated hex hash.
    fn parse_checksum(&self, value: &str) -> Result<(Arc<dyn Hasher>, String), SkipReason> {
        let sri = Sri::parse(value)?;
        let hasher = self.registry.get_by_name(&sri.algorithm)?;
        hasher.validate(&sri.hex)?;
        Ok((hasher, sri.hex))
    }

    async fn lookup_cas(&self, hasher: &dyn Hasher, hash: &str) -> Attempt<u64> {
        match self.cache.contains(EntryKind::Cas, hasher, hash, None).await {
            None => Attempt::Skip(SkipReason::Miss),
            Some(BlobSize::Known(size)) => Attempt::Hit(size),
            // The backend knows the entry but not its size; opening it is
            // the only way to learn it. The returned reader is dropped
            // unread, though a read-through backend may fill itself first.
            Some(BlobSize::Unknown) => {
                match self.cache.get(EntryKind::Cas, hasher, hash, None, 0).await {
                    Ok(Some((_reader, BlobSize::Known(size)))) => Attempt::Hit(size),
                    Ok(Some((_reader, BlobSize::Unknown))) => {
                        Attempt::Skip(SkipReason::UnknownSize("backend reported no size".to_string()))
                    }
                    Ok(None) => Attempt::Skip(SkipReason::UnknownSize("entry vanished".to_string())),
                    Err(e) => Attempt::Skip(SkipReason::UnknownSize(e.to_string())),
                }
            }
        }
    }

    /// Download one URI into the CAS.
    ///
    /// With an expected hash and a declared length the body streams straight
    /// into the cache, which verifies it. Otherwise it is buffered and hashed
    /// here first.
    async fn fetch_uri(
        &self,
        hasher: &dyn Hasher,
        uri: &str,
        expected_hash: Option<&str>,
    ) -> Attempt<(stowage_core::DigestFunction, BlobDigest)> {
        let url = match Url::parse(uri) {
            Ok(url) => url,
            Err(e) => return Attempt::Skip(SkipReason::InvalidUri(e.to_string())),
        };
        if !matches!(url.scheme(), "http" | "https") {
            return Attempt::Skip(SkipReason::UnsupportedScheme(url.scheme().to_string()));
        }

        let fetched = match self.fetcher.get(&url).await {
            Ok(fetched) => fetched,
            Err(e) => return Attempt::Skip(e.into()),
        };

        tracing::info!(uri = %uri, status = fetched.status, "ASSET FETCH");
        if !fetched.is_success() {
            return Attempt::Skip(SkipReason::HttpStatus(fetched.status));
        }

        let (hash, size, body): (String, u64, BlobReader) =
            match (expected_hash, fetched.content_length) {
                (Some(hash), Some(size)) => (hash.to_string(), size, fetched.body),
                _ => {
                    let data = match self.buffer_body(fetched.body, fetched.content_length).await {
                        Ok(data) => data,
                        Err(reason) => return Attempt::Skip(reason),
                    };
                    let actual = hasher.hash(&data);
                    if let Some(expected) = expected_hash {
                        if actual != expected {
                            return Attempt::Skip(SkipReason::HashMismatch {
                                expected: expected.to_string(),
                                actual,
                            });
                        }
                    }
                    let size = data.len() as u64;
                    (actual, size, Box::new(Cursor::new(data)))
                }
            };

        match self.cache.put(EntryKind::Cas, hasher, &hash, size, body).await {
            Ok(()) => {}
            Err(e) if e.is_benign() => {
                tracing::debug!(hash = %hash, error = %e, "concurrent identical write");
            }
            Err(source) => return Attempt::Skip(SkipReason::Put { hash, source }),
        }

        Attempt::Hit((hasher.digest_function(), BlobDigest::new(hash, size)))
    }

    async fn buffer_body(
        &self,
        body: BlobReader,
        content_length: Option<u64>,
    ) -> Result<Vec<u8>, SkipReason> {
        let mut data = Vec::new();
        match self.config.max_buffered_bytes {
            Some(limit) => {
                if content_length.is_some_and(|len| len > limit) {
                    return Err(SkipReason::TooLarge { limit });
                }
                body.take(limit.saturating_add(1))
                    .read_to_end(&mut data)
                    .await
                    .map_err(|e| SkipReason::Read(e.to_string()))?;
                if data.len() as u64 > limit {
                    return Err(SkipReason::TooLarge { limit });
                }
            }
            None => {
                let mut body = body;
                body.read_to_end(&mut data)
                    .await
                    .map_err(|e| SkipReason::Read(e.to_string()))?;
            }
        }

        if let Some(declared) = content_length {
            if declared != data.len() as u64 {
                return Err(SkipReason::Truncated {
                    declared,
                    actual: data.len() as u64,
                });
            }
        }
        Ok(data)
    }
}
