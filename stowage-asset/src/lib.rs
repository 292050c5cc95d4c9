//! Stowage Asset - Remote Asset Fetch Service
//!
//! Resolves FetchBlob requests: `checksum.sri` qualifiers are looked up in
//! the CAS, and failing that candidate URIs are downloaded, verified and
//! written into the CAS. Transport bindings (gRPC, HTTP) wrap
//! [`AssetResolver`]; none is provided here.

pub mod config;
pub mod fetch;
pub mod resolver;
pub mod sri;
pub mod types;

pub use config::AssetConfig;
pub use fetch::{FetchError, FetchedBody, HttpFetcher, UriFetcher};
pub use resolver::AssetResolver;
pub use sri::{Sri, SriError};
pub use types::{
    BlobDigest, Code, FetchBlobRequest, FetchBlobResponse, FetchDirectoryRequest,
    FetchDirectoryResponse, Qualifier, Status, CHECKSUM_SRI,
};
