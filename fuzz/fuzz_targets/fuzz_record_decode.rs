// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for the record decoder.
// Run with: cargo +nightly fuzz run fuzz_record_decode
//
// Any byte string must either decode or be rejected as truncated; a decoded
// record must re-encode to exactly the bytes it came from.

#![no_main]

use libfuzzer_sys::fuzz_target;
use samplog_recorder::{decode_record, RECORD_SIZE};

fuzz_target!(|data: &[u8]| {
    match decode_record(data) {
        Ok(sample) => {
            assert!(data.len() >= RECORD_SIZE);
            assert_eq!(sample.encode().as_bytes()[..], data[..RECORD_SIZE]);
        }
        Err(_) => assert!(data.len() < RECORD_SIZE),
    }
});
