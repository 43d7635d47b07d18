#![no_main]

use hdrkit_formats::{HeaderCodec, MpegAudioFrame, MpegAudioHeader, ParseStatus};
use libfuzzer_sys::fuzz_target;

// Fuzz target: MPEG audio header and frame parsing.
//
// Headers keep all 32 bits, so a parsed header must re-encode to its
// input. A parsed frame must consume exactly its computed length.
fuzz_target!(|data: &[u8]| {
    if let ParseStatus::Complete { value, consumed } = MpegAudioHeader::parse(data) {
        assert_eq!(consumed, 4);
        assert_eq!(value.to_bytes(), data[..4]);
    }
    if let ParseStatus::Complete { value, consumed } = MpegAudioFrame::parse(data) {
        assert_eq!(Some(consumed), value.header.frame_length());
        let _ = value.verify_crc();
    }
});
