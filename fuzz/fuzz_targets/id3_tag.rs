#![no_main]

use hdrkit_formats::{HeaderCodec, Id3v2Header, Id3v2Tag, ParseStatus};
use libfuzzer_sys::fuzz_target;

// Fuzz target: ID3v2 header and tag parsing.
//
// A complete tag never claims more bytes than its header declares.
fuzz_target!(|data: &[u8]| {
    let _ = Id3v2Header::parse(data);
    if let ParseStatus::Complete { value, consumed } = Id3v2Tag::parse(data) {
        assert_eq!(consumed, value.header.total_size());
    }
});
