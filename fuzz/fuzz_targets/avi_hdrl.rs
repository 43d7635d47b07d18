#![no_main]

use hdrkit_formats::{AviHeaderList, HeaderCodec, ParseStatus};
use libfuzzer_sys::fuzz_target;

// Fuzz target: AVI header list parsing.
//
// Exercises the streaming parse, the region parse and the file-level
// search. None of them may panic or read past a declared size. Pad bytes
// are written as zero, so a parsed list is compared after re-parsing its
// encoding rather than byte for byte.
fuzz_target!(|data: &[u8]| {
    if let ParseStatus::Complete { value, .. } = AviHeaderList::parse(data) {
        let bytes = value.encode().unwrap();
        assert_eq!(AviHeaderList::parse(&bytes).complete().map(|(v, _)| v), Some(value));
    }
    let _ = AviHeaderList::parse_region(data);
    let _ = AviHeaderList::find_in_file(data);
});
