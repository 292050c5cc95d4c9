//! BLAKE3 hasher.

use super::{DigestFunction, HashStream, Hasher};

const EMPTY: &str = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";

#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

struct Blake3Stream(::blake3::Hasher);

impl HashStream for Blake3Stream {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        self.0.finalize().to_hex().to_string()
    }
}

impl Hasher for Blake3Hasher {
    fn digest_function(&self) -> DigestFunction {
        DigestFunction::Blake3
    }

    fn name(&self) -> &'static str {
        "blake3"
    }

    fn stream(&self) -> Box<dyn HashStream> {
        Box::new(Blake3Stream(::blake3::Hasher::new()))
    }

    fn hash(&self, data: &[u8]) -> String {
        ::blake3::hash(data).to_hex().to_string()
    }

    fn empty(&self) -> &'static str {
        EMPTY
    }

    fn size(&self) -> usize {
        ::blake3::OUT_LEN
    }
}
