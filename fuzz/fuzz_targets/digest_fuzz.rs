//! Fuzz test for digest validation
//!
//! Every registered hasher must validate its own output for arbitrary input,
//! and must reject arbitrary strings without panicking.
//!
//! Run with: cargo +nightly fuzz run digest_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use stowage_core::HasherRegistry;

fuzz_target!(|data: &[u8]| {
    let registry = HasherRegistry::standard();
    let candidate = String::from_utf8_lossy(data);

    for hasher in registry.hashers() {
        let hash = hasher.hash(data);
        assert!(hasher.validate(&hash).is_ok(), "{} rejected its own digest", hasher.name());
        assert!(hasher.validate_digest(&hash, data.len() as u64).is_ok());

        // Must not panic on garbage.
        let _ = hasher.validate(&candidate);
        let _ = hasher.validate_digest(&candidate, 0);
    }
    let _ = registry.infer_from_hash(&candidate);
});
