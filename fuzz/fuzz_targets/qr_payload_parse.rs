#![no_main]

use libfuzzer_sys::fuzz_target;
use pinseed_core::backup::{parse_qr_payload, QR_PAYLOAD_PREFIX};

fuzz_target!(|data: &[u8]| {
    // Scanner output is untrusted: parse_qr_payload must never panic.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_qr_payload(s);

        // Also try with the prefix prepended to reach the hex and layout checks
        let prefixed = format!("{}{}", QR_PAYLOAD_PREFIX, s);
        let _ = parse_qr_payload(&prefixed);
    }
});
