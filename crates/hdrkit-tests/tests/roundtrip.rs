//! Roundtrip integration tests: parse → encode must reproduce the input
//! bytes exactly, and encode → parse must reproduce the value.
//!
//! The byte-identical invariant holds because every decoded structure keeps
//! all on-wire information: GZIP flags are derived from the fields present,
//! RIFF containers keep their children in file order with opaque bodies,
//! and an MPEG header stores every one of its 32 bits.

use hdrkit_formats::mpeg::MpegAudioHeader;
use hdrkit_formats::riff::FourCc;
use hdrkit_formats::{
    AviHeaderList, GzipHeader, GzipTrailer, HeaderCodec, Id3v2Header, Id3v2Tag, MpegAudioFrame,
    OperatingSystem, ParseStatus, PdfHeader, RiffFormHeader,
};
use hdrkit_tests::fixtures;
use hdrkit_wire::synchsafe::{decode_synchsafe, encode_synchsafe};
use proptest::prelude::*;

fn reencode<T: HeaderCodec>(bytes: &[u8]) -> (T, Vec<u8>)
where
    T::Error: std::fmt::Debug,
{
    let (value, consumed) = match T::parse(bytes) {
        ParseStatus::Complete { value, consumed } => (value, consumed),
        ParseStatus::NeedMore(n) => panic!("expected Complete, needs {n} more byte(s)"),
        ParseStatus::Invalid(e) => panic!("expected Complete, got {e:?}"),
    };
    assert_eq!(consumed, bytes.len(), "parse must consume the whole header");
    let out = value.encode().expect("re-encode");
    (value, out)
}

// ── GZIP ──────────────────────────────────────────────────────────────────────

#[test]
fn gzip_header_without_optional_fields() {
    let bytes = hex::decode("1f8b0800d20296650003").unwrap();
    let (header, out) = reencode::<GzipHeader>(&bytes);
    assert_eq!(header.mtime, 0x6596_02D2);
    assert_eq!(header.os, OperatingSystem::Unix);
    assert_eq!(out, bytes);
}

#[test]
fn gzip_header_with_filename_only() {
    let member = fixtures::gzip_hello();
    let header_bytes = &member[..fixtures::GZIP_HELLO_HEADER_LEN];
    let (header, out) = reencode::<GzipHeader>(header_bytes);
    assert_eq!(header.filename.as_deref(), Some(&b"hello.txt"[..]));
    assert_eq!(header.xfl, 2);
    assert_eq!(header.os, OperatingSystem::Unknown);
    assert_eq!(out, header_bytes);
}

#[test]
fn gzip_header_with_extra_and_header_crc() {
    let built = GzipHeader::new()
        .with_mtime(1_700_000_000)
        .with_os(OperatingSystem::Unix)
        .with_extra(*b"AP\x04\x00\x01\x02\x03\x04")
        .unwrap()
        .with_header_crc(true)
        .encode()
        .unwrap();
    assert_eq!(built.len(), 10 + 2 + 8 + 2);
    assert_eq!(built[3], 0b0000_0110);

    let (header, out) = reencode::<GzipHeader>(&built);
    assert!(header.header_crc);
    assert_eq!(out, built);
    let subfields: Vec<_> = header.subfields().collect::<Result<_, _>>().unwrap();
    assert_eq!(subfields.len(), 1);
    assert_eq!(&subfields[0].id, b"AP");
}

#[test]
fn gzip_trailer_of_reference_member() {
    let member = fixtures::gzip_hello();
    let (trailer, out) = reencode::<GzipTrailer>(&member[member.len() - 8..]);
    assert_eq!(trailer.crc32, 0xF424_7453);
    assert_eq!(trailer.isize, 13);
    assert!(trailer.verify(fixtures::GZIP_HELLO_PAYLOAD).is_ok());
    assert_eq!(out, &member[member.len() - 8..]);
}

fn latin1_field() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(1u8..=255, 0..40)
}

proptest! {
    #[test]
    fn gzip_any_optional_fields_roundtrip(
        mtime in any::<u32>(),
        xfl in any::<u8>(),
        os in any::<u8>(),
        text in any::<bool>(),
        extra in prop::option::of(prop::collection::vec(any::<u8>(), 0..64)),
        filename in prop::option::of(latin1_field()),
        comment in prop::option::of(latin1_field()),
        header_crc in any::<bool>(),
    ) {
        let mut header = GzipHeader::new()
            .with_mtime(mtime)
            .with_xfl(xfl)
            .with_os(OperatingSystem::from_byte(os))
            .with_text(text)
            .with_header_crc(header_crc);
        if let Some(extra) = extra {
            header = header.with_extra(extra).unwrap();
        }
        if let Some(name) = filename {
            header = header.with_filename(name).unwrap();
        }
        if let Some(comment) = comment {
            header = header.with_comment(comment).unwrap();
        }

        let bytes = header.encode().unwrap();
        prop_assert_eq!(bytes.len(), header.encoded_len());
        let (parsed, consumed) = GzipHeader::parse(&bytes).into_result().unwrap();
        prop_assert_eq!(consumed, bytes.len());
        prop_assert_eq!(&parsed, &header);
        prop_assert_eq!(parsed.encode().unwrap(), bytes);
    }
}

// ── MPEG audio ────────────────────────────────────────────────────────────────

/// Every 32-bit pattern with the sync bits set either parses and
/// re-encodes to itself, or is rejected outright.
#[test]
fn every_mpeg_header_pattern() {
    let mut valid = 0usize;
    for low in 0u32..1 << 21 {
        let bytes = (MpegAudioHeader::SYNC_MASK | low).to_be_bytes();
        match MpegAudioHeader::parse(&bytes) {
            ParseStatus::Complete { value, consumed } => {
                assert_eq!(consumed, 4);
                assert_eq!(value.to_bytes(), bytes, "pattern {low:#08X}");
                valid += 1;
            }
            ParseStatus::Invalid(_) => {}
            ParseStatus::NeedMore(n) => panic!("4 bytes can never need {n} more"),
        }
    }
    // 3 versions × 3 layers × 15 bitrates × 3 rates × 2^11 free bits.
    assert_eq!(valid, 829_440);
}

#[test]
fn mpeg_frames_roundtrip() {
    let stream = fixtures::mpeg_stream(4, true);
    let mut offset = 0;
    while offset < stream.len() {
        let (frame, out) = reencode::<MpegAudioFrame>(&stream[offset..offset + 417]);
        assert!(frame.verify_crc().is_ok());
        assert_eq!(frame.audio[0], (offset / 417) as u8);
        assert_eq!(out, &stream[offset..offset + 417]);
        offset += 417;
    }
}

// ── RIFF / AVI ────────────────────────────────────────────────────────────────

#[test]
fn avi_header_list_roundtrip_keeps_order_and_padding() {
    let list = fixtures::avi_header_list();
    let bytes = list.encode().unwrap();
    assert_eq!(bytes.len(), 314);
    // The odd-sized JUNK chunk is followed by a pad byte.
    assert_eq!(&bytes[bytes.len() - 12..bytes.len() - 4], b"JUNK\x03\x00\x00\x00");
    assert_eq!(bytes[bytes.len() - 1], 0);

    let (parsed, out) = reencode::<AviHeaderList>(&bytes);
    assert_eq!(parsed, list);
    assert_eq!(out, bytes);
}

#[test]
fn avi_file_header_and_hdrl() {
    let file = fixtures::avi_file();
    assert_eq!(file.len(), 352);
    let (riff, consumed) = RiffFormHeader::parse(&file).into_result().unwrap();
    assert_eq!(consumed, 12);
    assert_eq!(riff.size, 344);
    assert_eq!(riff.form_type, FourCc::AVI);

    let hdrl = AviHeaderList::find_in_file(&file).unwrap();
    assert_eq!(hdrl, fixtures::avi_header_list());
}

// ── ID3v2 ─────────────────────────────────────────────────────────────────────

#[test]
fn id3_tag_roundtrip() {
    let tag = fixtures::id3_tag();
    let bytes = tag.encode().unwrap();
    assert_eq!(bytes.len(), 81);
    assert_eq!(&bytes[..10], b"ID3\x03\x00\x00\x00\x00\x00\x47");

    let (parsed, out) = reencode::<Id3v2Tag>(&bytes);
    assert_eq!(parsed.frames.len(), 2);
    let title = parsed.frame(FourCc(*b"TIT2")).and_then(|f| f.text());
    assert_eq!(title.as_deref(), Some("Header Test"));
    assert_eq!(parsed.padding, 32);
    assert_eq!(out, bytes);
}

#[test]
fn synchsafe_one_thousand() {
    assert_eq!(encode_synchsafe(1000).unwrap(), [0x00, 0x00, 0x07, 0x68]);
    assert_eq!(decode_synchsafe(&[0x00, 0x00, 0x07, 0x68]).unwrap(), 1000);

    let (header, out) = reencode::<Id3v2Header>(b"ID3\x03\x00\x00\x00\x00\x07\x68");
    assert_eq!(header.size, 1000);
    assert_eq!(header.total_size(), 1010);
    assert_eq!(out, b"ID3\x03\x00\x00\x00\x00\x07\x68");
}

proptest! {
    #[test]
    fn synchsafe_every_28_bit_value(value in 0u32..1 << 28) {
        let bytes = encode_synchsafe(value).unwrap();
        prop_assert!(bytes.iter().all(|b| b & 0x80 == 0));
        prop_assert_eq!(decode_synchsafe(&bytes).unwrap(), value);
    }
}

// ── PDF ───────────────────────────────────────────────────────────────────────

#[test]
fn pdf_header_roundtrip() {
    let file = fixtures::pdf_file();
    let (header, consumed) = PdfHeader::parse(&file).into_result().unwrap();
    assert_eq!(consumed, 10);
    assert_eq!(header.version, "1.7");
    assert_eq!(header.encode().unwrap(), &file[..10]);
}
