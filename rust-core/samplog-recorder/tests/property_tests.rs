// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for scaling and the on-disk layout

use std::fs;

use proptest::prelude::*;
use samplog_recorder::{decode_record, scale, Logger, RecorderConfig, SyncMode, RECORD_SIZE};
use tempfile::TempDir;

/// Divisors in the ranges loggers are realistically opened with.
fn arb_divisor() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(1u64),
        Just(1_000u64),
        Just(1_000_000u64),
        Just(1_000_000_000u64),
        1u64..=u64::MAX,
    ]
}

fn arb_samples() -> impl Strategy<Value = Vec<(u64, u64, u64)>> {
    prop::collection::vec((any::<u64>(), any::<u64>(), any::<u64>()), 0..200)
}

proptest! {
    #[test]
    fn test_scale_is_truncating_division(raw in any::<u64>(), divisor in arb_divisor()) {
        let scaled = scale(raw, divisor);
        prop_assert_eq!(scaled, raw / divisor);
        prop_assert!(scaled <= raw);
    }

    #[test]
    fn test_scale_by_one_is_identity(raw in any::<u64>()) {
        prop_assert_eq!(scale(raw, 1), raw);
    }

    #[test]
    fn test_logged_samples_match_scaled_input(
        samples in arb_samples(),
        scale_when in arb_divisor(),
        scale_data in arb_divisor(),
        capacity in 1usize..64,
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prop.log");
        let config = RecorderConfig::new(&path)
            .with_scales(scale_when, scale_data)
            .with_buffer_capacity(capacity)
            .with_sync_mode(SyncMode::Async);
        let logger = Logger::open(config).unwrap();

        for &(series, timestamp, value) in &samples {
            logger.record(series, timestamp, value).unwrap();
        }
        logger.close().unwrap();

        let data = fs::read(&path).unwrap();
        prop_assert_eq!(data.len(), samples.len() * RECORD_SIZE);

        for (chunk, &(series, timestamp, value)) in data.chunks_exact(RECORD_SIZE).zip(&samples) {
            let decoded = decode_record(chunk).unwrap();
            prop_assert_eq!(decoded.series, series);
            prop_assert_eq!(decoded.timestamp, timestamp / scale_when);
            prop_assert_eq!(decoded.value, value / scale_data);
        }
    }

    #[test]
    fn test_decode_rejects_short_input(len in 0usize..RECORD_SIZE) {
        let bytes = vec![0u8; len];
        prop_assert!(decode_record(&bytes).is_err());
    }
}
