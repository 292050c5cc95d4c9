//! Hashers backed by the RustCrypto `digest` family (SHA-1, SHA-2, MD5).

use std::fmt;
use std::marker::PhantomData;

use sha2::Digest;

use super::{DigestFunction, HashStream, Hasher};

/// A [`Hasher`] for any RustCrypto digest type.
pub struct RustCryptoHasher<D> {
    function: DigestFunction,
    name: &'static str,
    empty: &'static str,
    _digest: PhantomData<fn() -> D>,
}

impl<D> RustCryptoHasher<D> {
    const fn new(function: DigestFunction, name: &'static str, empty: &'static str) -> Self {
        Self {
            function,
            name,
            empty,
            _digest: PhantomData,
        }
    }
}

impl<D> fmt::Debug for RustCryptoHasher<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RustCryptoHasher")
            .field("function", &self.function)
            .field("name", &self.name)
            .finish()
    }
}

struct DigestStream<D>(D);

impl<D: Digest + Send> HashStream for DigestStream<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        hex::encode(self.0.finalize())
    }
}

impl<D> Hasher for RustCryptoHasher<D>
where
    D: Digest + Default + Send + 'static,
{
    fn digest_function(&self) -> DigestFunction {
        self.function
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn stream(&self) -> Box<dyn HashStream> {
        Box::new(DigestStream(D::default()))
    }

    fn hash(&self, data: &[u8]) -> String {
        hex::encode(D::digest(data))
    }

    fn empty(&self) -> &'static str {
        self.empty
    }

    fn size(&self) -> usize {
        <D as Digest>::output_size()
    }
}

pub fn sha256() -> RustCryptoHasher<sha2::Sha256> {
    RustCryptoHasher::new(
        DigestFunction::Sha256,
        "sha256",
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
    )
}

pub fn sha384() -> RustCryptoHasher<sha2::Sha384> {
    RustCryptoHasher::new(
        DigestFunction::Sha384,
        "sha384",
        "38b060a751ac96384cd9327eb1b1e36a21fdb71114be07434c0cc7bf63f6e1da274edebfe76f65fbd51ad2f14898b95b",
    )
}

pub fn sha512() -> RustCryptoHasher<sha2::Sha512> {
    RustCryptoHasher::new(
        DigestFunction::Sha512,
        "sha512",
        "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e",
    )
}

pub fn sha1() -> RustCryptoHasher<::sha1::Sha1> {
    RustCryptoHasher::new(
        DigestFunction::Sha1,
        "sha1",
        "da39a3ee5e6b4b0d3255bfef95601890afd80709",
    )
}

pub fn md5() -> RustCryptoHasher<::md5::Md5> {
    RustCryptoHasher::new(
        DigestFunction::Md5,
        "md5",
        "d41d8cd98f00b204e9800998ecf8427e",
    )
}
