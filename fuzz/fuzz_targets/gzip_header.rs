#![no_main]

use hdrkit_formats::{GzipHeader, HeaderCodec, ParseStatus};
use libfuzzer_sys::fuzz_target;

// Fuzz target: GzipHeader::parse on arbitrary bytes.
//
// Must never panic. Any header that parses must re-encode to exactly
// the bytes it consumed.
fuzz_target!(|data: &[u8]| {
    if let ParseStatus::Complete { value, consumed } = GzipHeader::parse(data) {
        let out = value.encode().unwrap();
        assert_eq!(out, &data[..consumed]);
    }
});
