//! In-memory cache backend.
//!
//! A complete [`BlobCache`] that keeps entries in a map keyed by their
//! storage path. It validates digests, verifies CAS content on write, and
//! can sit in front of a [`ProxyBackend`]. Used by tests and by embedders
//! that do not need persistence.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use stowage_core::{CacheError, EntryKind, Hasher};
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

use crate::traits::{BlobCache, BlobReader, BlobSize, CacheStats, ProxyBackend};

/// In-memory [`BlobCache`] with optional proxy write-through.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Bytes>>,
    in_flight: Mutex<HashSet<String>>,
    proxy: Option<Arc<dyn ProxyBackend>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Removes an in-flight marker when the write finishes, however it finishes.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.key);
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a proxy behind this cache.
    pub fn with_proxy(mut self, proxy: Arc<dyn ProxyBackend>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entries.len() as u64,
            memory_bytes: entries.values().map(|b| b.len() as u64).sum(),
        }
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn begin_write(&self, key: &str) -> Result<InFlightGuard<'_>, CacheError> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(key.to_string()) {
            return Err(CacheError::ConcurrentWrite {
                key: key.to_string(),
            });
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            key: key.to_string(),
        })
    }

    async fn lookup(&self, path: &str) -> Option<Bytes> {
        let found = self.entries.read().await.get(path).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Read exactly `expected` bytes (when known) and verify them against
    /// `hash` for the validated kinds.
    async fn read_verified(
        kind: EntryKind,
        hasher: &dyn Hasher,
        hash: &str,
        expected: Option<u64>,
        mut data: BlobReader,
    ) -> Result<Bytes, CacheError> {
        let mut buf = Vec::new();
        match expected {
            Some(size) => {
                (&mut data).take(size.saturating_add(1)).read_to_end(&mut buf).await?;
                if buf.len() as u64 != size {
                    return Err(CacheError::SizeMismatch {
                        hash: hash.to_string(),
                        expected: size,
                        actual: buf.len() as u64,
                    });
                }
            }
            None => {
                data.read_to_end(&mut buf).await?;
            }
        }

        if kind == EntryKind::Cas {
            let actual = hasher.hash(&buf);
            if actual != hash {
                return Err(CacheError::HashMismatch {
                    expected: hash.to_string(),
                    actual,
                });
            }
        }
        Ok(Bytes::from(buf))
    }

    async fn store(&self, kind: EntryKind, path: String, hash: &str, blob: Bytes) {
        let size = blob.len() as u64;
        self.entries.write().await.insert(path, blob.clone());
        if let Some(proxy) = &self.proxy {
            proxy.put(kind, hash, size, size, blob);
        }
    }

    /// Pull an entry from the proxy into the local map.
    async fn fill_from_proxy(
        &self,
        kind: EntryKind,
        hasher: &dyn Hasher,
        hash: &str,
        size: Option<u64>,
    ) -> Result<Option<Bytes>, CacheError> {
        let Some(proxy) = &self.proxy else {
            return Ok(None);
        };
        let Some((reader, proxy_size)) = proxy.get(kind, hash, size).await? else {
            return Ok(None);
        };

        let expected = proxy_size.known().or(size);
        let blob = Self::read_verified(kind, hasher, hash, expected, reader).await?;

        let path = kind.blob_path(hasher, hash);
        self.entries.write().await.insert(path, blob.clone());
        tracing::debug!(%kind, hash, size = blob.len(), "filled entry from proxy");
        Ok(Some(blob))
    }
}

fn validate(kind: EntryKind, hasher: &dyn Hasher, hash: &str, size: u64) -> Result<(), CacheError> {
    match kind {
        EntryKind::Raw => Ok(()),
        EntryKind::Ac | EntryKind::Cas => Ok(hasher.validate_digest(hash, size)?),
    }
}

#[async_trait]
impl BlobCache for InMemoryCache {
    async fn contains(
        &self,
        kind: EntryKind,
        hasher: &dyn Hasher,
        hash: &str,
        size: Option<u64>,
    ) -> Option<BlobSize> {
        if kind == EntryKind::Cas && hasher.is_empty_hash(hash) {
            return Some(BlobSize::Known(0));
        }

        let path = kind.blob_path(hasher, hash);
        if let Some(blob) = self.lookup(&path).await {
            let actual = blob.len() as u64;
            return match size {
                Some(expected) if expected != actual => None,
                _ => Some(BlobSize::Known(actual)),
            };
        }

        match &self.proxy {
            Some(proxy) => proxy.contains(kind, hash, size).await,
            None => None,
        }
    }

    async fn get(
        &self,
        kind: EntryKind,
        hasher: &dyn Hasher,
        hash: &str,
        size: Option<u64>,
        offset: u64,
    ) -> Result<Option<(BlobReader, BlobSize)>, CacheError> {
        let blob = if kind == EntryKind::Cas && hasher.is_empty_hash(hash) {
            Some(Bytes::new())
        } else {
            match self.lookup(&kind.blob_path(hasher, hash)).await {
                Some(blob) => Some(blob),
                None => self.fill_from_proxy(kind, hasher, hash, size).await?,
            }
        };
        let Some(blob) = blob else {
            return Ok(None);
        };

        let total = blob.len() as u64;
        if let Some(expected) = size {
            if expected != total {
                return Ok(None);
            }
        }
        if offset > total {
            return Err(CacheError::Status {
                code: 416,
                text: format!("offset {} beyond end of {} byte entry {}", offset, total, hash),
            });
        }

        let reader: BlobReader = Box::new(Cursor::new(blob.slice(offset as usize..)));
        Ok(Some((reader, BlobSize::Known(total))))
    }

    async fn put(
        &self,
        kind: EntryKind,
        hasher: &dyn Hasher,
        hash: &str,
        size: u64,
        data: BlobReader,
    ) -> Result<(), CacheError> {
        validate(kind, hasher, hash, size)?;

        if kind == EntryKind::Cas && hasher.is_empty_hash(hash) {
            return Ok(());
        }

        let path = kind.blob_path(hasher, hash);
        if kind == EntryKind::Cas && self.entries.read().await.contains_key(&path) {
            // Content addressed: whatever is stored is already these bytes.
            return Ok(());
        }

        let _guard = self.begin_write(&path)?;
        let blob = Self::read_verified(kind, hasher, hash, Some(size), data).await?;
        self.store(kind, path, hash, blob).await;
        Ok(())
    }
}
