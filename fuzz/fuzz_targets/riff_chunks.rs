#![no_main]

use hdrkit_formats::riff::ChunkIter;
use hdrkit_formats::{ChunkHeader, HeaderCodec, RiffFormHeader};
use libfuzzer_sys::fuzz_target;

// Fuzz target: RIFF form header and chunk walking.
//
// The iterator stops at the first error; every chunk it yields must lie
// inside the input.
fuzz_target!(|data: &[u8]| {
    let _ = RiffFormHeader::parse(data);
    for chunk in ChunkIter::new(data) {
        match chunk {
            Ok(chunk) => {
                assert_eq!(chunk.body.len(), chunk.header.body_len());
                assert!(chunk.offset + ChunkHeader::LEN + chunk.body.len() <= data.len());
            }
            Err(_) => break,
        }
    }
});
