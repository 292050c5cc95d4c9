//! Fuzz test for checksum.sri parsing
//!
//! Arbitrary qualifier values must never panic the parser, and anything it
//! accepts must come back as lowercase hex that re-encodes to the same digest.
//!
//! Run with: cargo +nightly fuzz run sri_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use stowage_asset::Sri;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(sri) = Sri::parse(input) {
        assert_eq!(sri.hex.len() % 2, 0, "hex digest has odd length");
        assert!(
            sri.hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)),
            "hex digest is not lowercase hex"
        );
        assert!(input.starts_with(&sri.algorithm));

        let encoded = Sri::encode(&sri.algorithm, &sri.hex).expect("parsed hex re-encodes");
        let reparsed = Sri::parse(&encoded).expect("encoded SRI parses");
        assert_eq!(reparsed, sri);
    }
});
