//! Fixture builders.
//!
//! | Builder                | Contents                                          |
//! |------------------------|---------------------------------------------------|
//! | `gzip_hello`           | gzip member: FNAME "hello.txt", 13-byte payload   |
//! | `mpeg_stream`          | back-to-back MPEG-1 Layer III 128 kbps frames     |
//! | `tagged_mpeg_stream`   | ID3v2.3 tag (TIT2, TPE1, padding) + frames        |
//! | `avi_header_list`      | `hdrl`: main header, 2 × `strl`, odd-sized JUNK   |
//! | `avi_file`             | `RIFF 'AVI '` with `hdrl` and a small `movi`      |
//! | `pdf_file`             | PDF 1.7 header line + binary comment line         |

use hdrkit_formats::mpeg::{ChannelMode, MpegLayer, MpegVersion};
use hdrkit_formats::riff::FourCc;
use hdrkit_formats::{
    AviFlags, AviHeaderList, AviMainHeader, HeaderCodec, Id3Frame, Id3v2Tag, ListHeader,
    MpegAudioFrame, MpegAudioHeader, RawChunk, RiffFormHeader, StreamHeaderList,
};

// ── GZIP ──────────────────────────────────────────────────────────────────────

/// `hello, world\n` compressed by a reference gzip with FNAME `hello.txt`,
/// MTIME 0, XFL 2, OS 255.
pub const GZIP_HELLO: &str = "1f8b08080000000002ff68656c6c6f2e74787400\
                              cb48cdc9c9d75128cf2fca49e10200\
                              537424f40d000000";

/// Length of the member header inside [`GZIP_HELLO`].
pub const GZIP_HELLO_HEADER_LEN: usize = 20;

/// Uncompressed payload of [`GZIP_HELLO`].
pub const GZIP_HELLO_PAYLOAD: &[u8] = b"hello, world\n";

pub fn gzip_hello() -> Vec<u8> {
    hex::decode(GZIP_HELLO).expect("fixture hex is valid")
}

// ── MPEG audio ────────────────────────────────────────────────────────────────

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, stereo: 417-byte frames.
pub fn mpeg_header(protected: bool) -> MpegAudioHeader {
    MpegAudioHeader::new(MpegVersion::V1, MpegLayer::III, 9, 0, ChannelMode::Stereo)
        .expect("valid header fields")
        .with_protection(protected)
}

/// One encoded frame whose audio bytes are all `fill`.
pub fn mpeg_frame(protected: bool, fill: u8) -> Vec<u8> {
    let header = mpeg_header(protected);
    let len = header.audio_data_len().expect("fixed bitrate");
    MpegAudioFrame::new(header, vec![fill; len])
        .and_then(|f| f.encode())
        .expect("frame encodes")
}

/// `frames` back-to-back frames; the audio of frame `i` is filled with `i`.
pub fn mpeg_stream(frames: usize, protected: bool) -> Vec<u8> {
    (0..frames)
        .flat_map(|i| mpeg_frame(protected, i as u8))
        .collect()
}

pub fn id3_tag() -> Id3v2Tag {
    Id3v2Tag::new()
        .with_frame(Id3Frame::text_latin1(FourCc(*b"TIT2"), "Header Test").expect("latin1"))
        .with_frame(Id3Frame::text_latin1(FourCc(*b"TPE1"), "hdrkit").expect("latin1"))
        .with_padding(32)
}

/// An ID3v2.3 tag followed by `frames` frames.
pub fn tagged_mpeg_stream(frames: usize) -> Vec<u8> {
    let mut out = id3_tag().encode().expect("tag encodes");
    out.extend(mpeg_stream(frames, false));
    out
}

// ── RIFF / AVI ────────────────────────────────────────────────────────────────

pub fn avi_main_header() -> AviMainHeader {
    AviMainHeader {
        micro_sec_per_frame: 40_000,
        max_bytes_per_sec: 250_000,
        flags: AviFlags::HAS_INDEX.union(AviFlags::IS_INTERLEAVED),
        total_frames: 250,
        streams: 2,
        suggested_buffer_size: 32_768,
        width: 320,
        height: 240,
        ..AviMainHeader::default()
    }
}

fn strl(kind: &[u8; 4], format_len: usize) -> StreamHeaderList {
    let mut strh = vec![0u8; 56];
    strh[..4].copy_from_slice(kind);
    StreamHeaderList::new(vec![
        RawChunk::new(FourCc::STRH, strh).expect("small chunk"),
        RawChunk::new(FourCc::STRF, vec![0x5A; format_len]).expect("small chunk"),
    ])
    .expect("starts with strh")
}

/// Video and audio stream lists, then a 3-byte JUNK chunk that needs a
/// pad byte.
pub fn avi_header_list() -> AviHeaderList {
    AviHeaderList::new(avi_main_header())
        .with_stream(strl(b"vids", 40))
        .with_stream(strl(b"auds", 18))
        .with_chunk(RawChunk::new(FourCc::JUNK, vec![0; 3]).expect("small chunk"))
}

/// A whole AVI file: `hdrl` followed by a `movi` list with one chunk.
pub fn avi_file() -> Vec<u8> {
    let hdrl = avi_header_list().encode().expect("hdrl encodes");
    let frame = RawChunk::new(FourCc(*b"00dc"), vec![1, 2, 3, 4, 5])
        .and_then(|c| c.encode())
        .expect("chunk encodes");
    let mut movi = ListHeader::for_content(FourCc(*b"movi"), frame.len())
        .and_then(|l| l.encode())
        .expect("list header encodes");
    movi.extend(frame);

    let riff = RiffFormHeader {
        size: (4 + hdrl.len() + movi.len()) as u32,
        form_type: FourCc::AVI,
    };
    let mut out = riff.encode().expect("riff header encodes");
    out.extend(hdrl);
    out.extend(movi);
    out
}

// ── PDF ───────────────────────────────────────────────────────────────────────

/// Header line, binary comment line and the start of the first object.
pub fn pdf_file() -> Vec<u8> {
    b"%PDF-1.7\r\n%\xE2\xE3\xCF\xD3\r\n1 0 obj\r\n".to_vec()
}
