//! Stowage Test Utilities
//!
//! Shared test infrastructure for the stowage workspace:
//! - Random blob generators keyed by digest function
//! - SRI string builders
//! - A recording proxy backend
//! - A local HTTP server that serves one blob

use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use rand::RngCore;
use tokio::sync::oneshot;

// Re-export core types for convenience
pub use stowage_core::hashing::sha256;
pub use stowage_core::{EntryKind, Hasher, HasherRegistry};
pub use stowage_storage::{BlobReader, BlobSize, InMemoryCache, ProxyBackend};

// ============================================================================
// GENERATORS
// ============================================================================

/// Random bytes of `size` and their hex digest under `hasher`.
pub fn random_data_and_hash(hasher: &dyn Hasher, size: usize) -> (Vec<u8>, String) {
    let mut data = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut data);
    let hash = hasher.hash(&data);
    (data, hash)
}

pub fn random_data_and_sha256(size: usize) -> (Vec<u8>, String) {
    random_data_and_hash(&sha256(), size)
}

/// Random bytes with their SHA-256 digest as `(hash, size)`.
pub fn random_data_and_sha256_digest(size: usize) -> (Vec<u8>, String, u64) {
    let (data, hash) = random_data_and_sha256(size);
    let len = data.len() as u64;
    (data, hash, len)
}

/// `checksum.sri` value for a hex digest, e.g. `sha256-47DEQpj8...`.
///
/// Panics on a non-hex digest; callers pass hashes they just computed.
pub fn sri_for(hasher: &dyn Hasher, hex_digest: &str) -> String {
    let raw = hex::decode(hex_digest).expect("sri_for needs a hex digest");
    format!("{}-{}", hasher.name(), STANDARD.encode(raw))
}

/// Install a fmt subscriber for test output. Safe to call from every test.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MOCK PROXY
// ============================================================================

/// In-memory [`ProxyBackend`] that records every upload.
#[derive(Debug, Default)]
pub struct RecordingProxy {
    blobs: Mutex<HashMap<String, Bytes>>,
    puts: Mutex<Vec<String>>,
    hide_size: bool,
}

impl RecordingProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A proxy that answers lookups with [`BlobSize::Unknown`], like an HTTP
    /// backend whose HEAD responses lack a content length.
    pub fn hiding_sizes() -> Self {
        Self {
            hide_size: true,
            ..Self::default()
        }
    }

    /// Store an entry without recording it as an upload.
    pub fn seed(&self, kind: EntryKind, hash: &str, data: Bytes) {
        self.blobs
            .lock()
            .expect("proxy lock poisoned")
            .insert(stowage_core::lookup_key(kind, hash), data);
    }

    /// Lookup keys (`cas/<hash>`) of every upload, in order.
    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().expect("proxy lock poisoned").clone()
    }

    fn size_of(&self, blob: &Bytes) -> BlobSize {
        if self.hide_size {
            BlobSize::Unknown
        } else {
            BlobSize::Known(blob.len() as u64)
        }
    }
}

#[async_trait]
impl ProxyBackend for RecordingProxy {
    fn put(&self, kind: EntryKind, hash: &str, _logical_size: u64, _size_on_disk: u64, data: Bytes) {
        let key = stowage_core::lookup_key(kind, hash);
        self.puts.lock().expect("proxy lock poisoned").push(key.clone());
        self.blobs.lock().expect("proxy lock poisoned").insert(key, data);
    }

    async fn get(
        &self,
        kind: EntryKind,
        hash: &str,
        _size: Option<u64>,
    ) -> Result<Option<(BlobReader, BlobSize)>, stowage_core::CacheError> {
        let found = self
            .blobs
            .lock()
            .expect("proxy lock poisoned")
            .get(&stowage_core::lookup_key(kind, hash))
            .cloned();
        Ok(found.map(|blob| {
            let size = self.size_of(&blob);
            (Box::new(Cursor::new(blob)) as BlobReader, size)
        }))
    }

    async fn contains(&self, kind: EntryKind, hash: &str, _size: Option<u64>) -> Option<BlobSize> {
        let blobs = self.blobs.lock().expect("proxy lock poisoned");
        blobs
            .get(&stowage_core::lookup_key(kind, hash))
            .map(|blob| self.size_of(blob))
    }
}

// ============================================================================
// HTTP BLOB SERVER
// ============================================================================

struct ServerState {
    path: String,
    blob: Bytes,
    requests: AtomicUsize,
}

/// Local HTTP server serving one blob at `/<hash>.tar.gz`; every other path
/// is a 404. Shuts down when dropped.
pub struct TestBlobServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestBlobServer {
    /// Bind to an ephemeral loopback port and start serving.
    pub async fn start(blob: impl Into<Bytes>, hash: &str) -> std::io::Result<Self> {
        let state = Arc::new(ServerState {
            path: format!("/{}.tar.gz", hash),
            blob: blob.into(),
            requests: AtomicUsize::new(0),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = Router::new()
            .fallback(serve_blob)
            .with_state(Arc::clone(&state));

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    rx.await.ok();
                })
                .await;
        });

        Ok(Self {
            addr,
            state,
            shutdown: Some(tx),
        })
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    /// URL the blob is served at.
    pub fn blob_url(&self) -> String {
        self.url(&self.state.path)
    }

    /// Requests received so far, on any path.
    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

impl Drop for TestBlobServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn serve_blob(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if uri.path() == state.path {
        (StatusCode::OK, state.blob.clone()).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::hashing::sha512;

    #[test]
    fn test_random_data_matches_hash() {
        let hasher = sha512();
        let (data, hash) = random_data_and_hash(&hasher, 256);
        assert_eq!(data.len(), 256);
        assert_eq!(hasher.hash(&data), hash);
        assert!(hasher.validate(&hash).is_ok());

        let (data, hash, size) = random_data_and_sha256_digest(10);
        assert_eq!(size, 10);
        assert_eq!(sha256().hash(&data), hash);
    }

    #[test]
    fn test_sri_for_empty_sha256() {
        let hasher = sha256();
        assert_eq!(
            sri_for(&hasher, hasher.empty()),
            "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[tokio::test]
    async fn test_recording_proxy() {
        let proxy = RecordingProxy::new();
        proxy.put(EntryKind::Cas, "ab", 2, 2, Bytes::from_static(b"hi"));
        assert_eq!(proxy.puts(), vec!["cas/ab".to_string()]);
        assert_eq!(
            proxy.contains(EntryKind::Cas, "ab", None).await,
            Some(BlobSize::Known(2))
        );
        assert_eq!(proxy.contains(EntryKind::Ac, "ab", None).await, None);

        let hidden = RecordingProxy::hiding_sizes();
        hidden.seed(EntryKind::Cas, "cd", Bytes::from_static(b"yo"));
        assert!(hidden.puts().is_empty());
        assert_eq!(
            hidden.contains(EntryKind::Cas, "cd", None).await,
            Some(BlobSize::Unknown)
        );
    }
}
