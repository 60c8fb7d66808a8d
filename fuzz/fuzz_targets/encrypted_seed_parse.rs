#![no_main]

use libfuzzer_sys::fuzz_target;
use pinseed_core::crypto::EncryptedSeed;

fuzz_target!(|data: &[u8]| {
    // Binary layout: from_bytes must return Ok or Err, never panic.
    if let Ok(seed) = EncryptedSeed::from_bytes(data) {
        // Accepted input must survive a re-encode unchanged
        let bytes = seed.to_bytes();
        assert_eq!(bytes.as_slice(), data);
        assert_eq!(EncryptedSeed::from_bytes(&bytes).ok(), Some(seed));
    }

    // Text form
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = s.parse::<EncryptedSeed>();
    }
});
