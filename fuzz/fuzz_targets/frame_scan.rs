#![no_main]

use hdrkit_formats::{FrameReader, FrameScanner, ScanConfig};
use libfuzzer_sys::fuzz_target;

// Fuzz target: MPEG frame scanning over a slice and over a reader.
//
// Both front ends run the same sync search, so they must agree on every
// frame up to the first error.
fuzz_target!(|data: &[u8]| {
    let config = ScanConfig {
        verify_crc: data.first().is_some_and(|b| b & 1 == 1),
        ..ScanConfig::default()
    };
    let scanned: Vec<_> = FrameScanner::with_config(data, config)
        .map_while(Result::ok)
        .collect();
    let read: Vec<_> = FrameReader::with_config(data, config)
        .map_while(Result::ok)
        .collect();
    assert_eq!(scanned, read);
});
