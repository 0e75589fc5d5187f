// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for time-unit and bucket parsing.
// Run with: cargo +nightly fuzz run fuzz_time_units

#![no_main]

use libfuzzer_sys::fuzz_target;
use samplog_recorder::scale::{bucket_size, TimeUnit};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if input.len() <= 256 {
            let _ = input.parse::<TimeUnit>();
            if let Ok(nanos) = bucket_size(input) {
                assert!(nanos > 0);
            }
        }
    }
});
