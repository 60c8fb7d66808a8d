#![no_main]

use libfuzzer_sys::fuzz_target;
use pinseed_core::seed::{decode, encode, from_display_string};

fuzz_target!(|data: &[u8]| {
    // Arbitrary text through the strict mnemonic parser; never panics.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(words) = from_display_string(s) {
            if let Ok(seed) = decode(&words) {
                // A mnemonic that decodes must encode back to the same words
                let again = encode(&seed).expect("valid seed encodes");
                assert_eq!(again, words);
            }
        }
    }
});
