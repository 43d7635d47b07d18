#![no_main]

use arbitrary::Arbitrary;
use hdrkit_formats::{GzipHeader, HeaderCodec, OperatingSystem};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Fields {
    mtime: u32,
    xfl: u8,
    os: u8,
    text: bool,
    header_crc: bool,
    extra: Option<Vec<u8>>,
    filename: Option<Vec<u8>>,
    comment: Option<Vec<u8>>,
}

// Fuzz target: GzipHeader build->encode->parse roundtrip.
//
// Builder-rejected fields (NUL in a string, oversized extra) are
// skipped; anything accepted must survive the roundtrip unchanged.
fuzz_target!(|fields: Fields| {
    let mut header = GzipHeader::new()
        .with_mtime(fields.mtime)
        .with_xfl(fields.xfl)
        .with_os(OperatingSystem::from_byte(fields.os))
        .with_text(fields.text)
        .with_header_crc(fields.header_crc);
    if let Some(extra) = fields.extra {
        let Ok(h) = header.with_extra(extra) else { return };
        header = h;
    }
    if let Some(name) = fields.filename {
        let Ok(h) = header.with_filename(name) else { return };
        header = h;
    }
    if let Some(comment) = fields.comment {
        let Ok(h) = header.with_comment(comment) else { return };
        header = h;
    }

    let bytes = header.encode().unwrap();
    assert_eq!(bytes.len(), header.encoded_len());
    let (parsed, consumed) = GzipHeader::parse(&bytes).into_result().unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(parsed, header);
});
