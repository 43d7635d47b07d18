//! Incremental parsing: every parser fed a growing prefix of a valid
//! encoding must answer `NeedMore(n)` until the last byte arrives, with
//! `n` never asking for bytes past the end of the structure.
//!
//! The blocking [`FrameReader`] is also driven through a reader that
//! returns one byte per call, which exercises the same `NeedMore` top-up
//! loop a network client would run.

use std::io::{self, Cursor, Read};

use hdrkit_formats::mpeg::ScannedFrame;
use hdrkit_formats::{
    AviHeaderList, FormatError, FrameReader, FrameScanner, GzipHeader, GzipTrailer, HeaderCodec,
    Id3v2Tag, MpegAudioFrame, ParseStatus, PdfHeader, RiffFormHeader, ScanConfig,
};
use hdrkit_tests::fixtures;

/// Feed `bytes` one more byte at a time and check the `NeedMore` contract.
fn feed<T: HeaderCodec>(bytes: &[u8]) -> T
where
    T::Error: std::fmt::Debug,
{
    for k in 0..bytes.len() {
        match T::parse(&bytes[..k]) {
            ParseStatus::NeedMore(n) => {
                assert!(n >= 1, "NeedMore(0) at prefix {k}");
                let left = bytes.len() - k;
                assert!(n <= left, "prefix {k} asks for {n}, only {left} left");
            }
            ParseStatus::Complete { consumed, .. } => {
                panic!("prefix {k} completed early, consuming {consumed}")
            }
            ParseStatus::Invalid(e) => panic!("prefix {k} rejected: {e:?}"),
        }
    }
    match T::parse(bytes) {
        ParseStatus::Complete { value, consumed } => {
            assert_eq!(consumed, bytes.len());
            value
        }
        other => panic!("full input did not complete: {:?}", other.map(|_| ())),
    }
}

// ── GZIP ──────────────────────────────────────────────────────────────────────

#[test]
fn gzip_five_then_five() {
    let header = GzipHeader::new().encode().unwrap();
    assert_eq!(header.len(), 10);

    let mut buf = header[..5].to_vec();
    assert!(matches!(GzipHeader::parse(&buf), ParseStatus::NeedMore(5)));
    buf.extend_from_slice(&header[5..]);
    assert!(matches!(
        GzipHeader::parse(&buf),
        ParseStatus::Complete { consumed: 10, .. }
    ));
}

#[test]
fn gzip_need_more_counts_every_announced_field() {
    let header = GzipHeader::new()
        .with_extra(vec![7; 4])
        .unwrap()
        .with_filename("a.bin")
        .unwrap()
        .with_comment("c")
        .unwrap()
        .with_header_crc(true)
        .encode()
        .unwrap();

    // Fixed part short by 2, plus XLEN (2), one terminator each and FHCRC (2).
    assert!(matches!(GzipHeader::parse(&header[..8]), ParseStatus::NeedMore(8)));
    // Fixed part complete, XLEN missing.
    assert!(matches!(GzipHeader::parse(&header[..10]), ParseStatus::NeedMore(6)));
    // XLEN read: the extra body is now known exactly.
    assert!(matches!(GzipHeader::parse(&header[..12]), ParseStatus::NeedMore(8)));
    // Inside the unterminated filename.
    assert!(matches!(GzipHeader::parse(&header[..18]), ParseStatus::NeedMore(4)));
    // Only FHCRC missing.
    let without_crc = header.len() - 2;
    assert!(matches!(GzipHeader::parse(&header[..without_crc]), ParseStatus::NeedMore(2)));
}

#[test]
fn gzip_reference_header_byte_by_byte() {
    let member = fixtures::gzip_hello();
    let header: GzipHeader = feed(&member[..fixtures::GZIP_HELLO_HEADER_LEN]);
    assert_eq!(header.filename.as_deref(), Some(&b"hello.txt"[..]));
    let trailer: GzipTrailer = feed(&member[member.len() - 8..]);
    assert_eq!(trailer.isize, 13);
}

// ── Other formats ─────────────────────────────────────────────────────────────

#[test]
fn mpeg_frame_byte_by_byte() {
    let frame: MpegAudioFrame = feed(&fixtures::mpeg_frame(true, 0x33));
    assert!(frame.verify_crc().is_ok());
}

#[test]
fn riff_and_hdrl_byte_by_byte() {
    let file = fixtures::avi_file();
    let riff: RiffFormHeader = feed(&file[..12]);
    assert_eq!(riff.size, 344);

    let hdrl_bytes = fixtures::avi_header_list().encode().unwrap();
    let hdrl: AviHeaderList = feed(&hdrl_bytes);
    assert_eq!(hdrl.streams().count(), 2);
}

#[test]
fn id3_tag_byte_by_byte() {
    let bytes = fixtures::id3_tag().encode().unwrap();
    let tag: Id3v2Tag = feed(&bytes);
    assert_eq!(tag.frames.len(), 2);
}

#[test]
fn pdf_header_byte_by_byte() {
    let file = fixtures::pdf_file();
    let header: PdfHeader = feed(&file[..10]);
    assert_eq!(header.version, "1.7");
    // A lone CR may still grow into CRLF.
    assert!(matches!(PdfHeader::parse(&file[..9]), ParseStatus::NeedMore(1)));
}

// ── Blocking frame reader ─────────────────────────────────────────────────────

/// Hands out one byte per read call, with an `Interrupted` error before
/// every byte.
struct Stutter<'a> {
    rest: &'a [u8],
    interrupt: bool,
}

impl Read for Stutter<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.interrupt = !self.interrupt;
        if self.interrupt {
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        match (self.rest.split_first(), out.first_mut()) {
            (Some((&b, rest)), Some(slot)) => {
                *slot = b;
                self.rest = rest;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[test]
fn reader_over_stuttering_source_matches_scanner() {
    let stream = fixtures::tagged_mpeg_stream(3);
    let config = ScanConfig {
        verify_crc: true,
        ..ScanConfig::default()
    };
    let from_reader: Vec<ScannedFrame> = FrameReader::with_config(
        Stutter {
            rest: &stream,
            interrupt: false,
        },
        config,
    )
    .collect::<Result<_, _>>()
    .unwrap();
    let from_scanner: Vec<ScannedFrame> = FrameScanner::with_config(&stream, config)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(from_reader.len(), 3);
    assert_eq!(from_reader, from_scanner);
    assert_eq!(from_reader[0].offset, 81);
    assert_eq!(from_reader[2].offset, 81 + 2 * 417);
}

#[test]
fn reader_reports_io_errors() {
    struct Broken;
    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }
    let err = FrameReader::new(Broken).next().unwrap().unwrap_err();
    assert!(matches!(err, FormatError::Wire(_)));
    assert!(err.to_string().contains("disk on fire"));
}

#[test]
fn reader_position_tracks_consumed_bytes() {
    let stream = fixtures::tagged_mpeg_stream(2);
    let mut reader = FrameReader::new(Cursor::new(&stream));
    reader.next().unwrap().unwrap();
    assert_eq!(reader.position(), 81 + 417);
    reader.next().unwrap().unwrap();
    assert!(reader.next().is_none());
    assert_eq!(reader.position(), stream.len());
}
