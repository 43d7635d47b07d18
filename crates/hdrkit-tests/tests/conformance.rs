//! Conformance tests: fixtures decoded and rendered to insta snapshots.
//!
//! Each test decodes a fixture from [`hdrkit_tests::fixtures`] (or a fixed
//! set of header words) and renders the decoded fields as plain text. The
//! text is compared against a committed snapshot in `tests/snapshots/`, so
//! any change to decoded values, `Display` output or error wording shows up
//! as a reviewable diff.
//!
//! A deliberate change is accepted with:
//!
//! ```bash
//! cargo insta review -p hdrkit-tests
//! ```

use std::fmt::Write as _;

use hdrkit_formats::gzip::latin1;
use hdrkit_formats::mpeg::{ChannelMode, Emphasis, MpegLayer, MpegVersion};
use hdrkit_formats::{
    AviHeaderList, GzipHeader, GzipTrailer, HdrlEntry, HeaderCodec, Id3v2Header, Id3v2Tag,
    MpegAudioFrame, MpegAudioHeader, OperatingSystem,
};
use hdrkit_tests::fixtures;
use insta::assert_snapshot;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn header(
    version: MpegVersion,
    layer: MpegLayer,
    bitrate_index: u8,
    sampling_index: u8,
    mode: ChannelMode,
) -> MpegAudioHeader {
    MpegAudioHeader::new(version, layer, bitrate_index, sampling_index, mode)
        .unwrap_or_else(|e| panic!("fixture header rejected: {e}"))
}

fn lines(items: impl IntoIterator<Item = String>) -> String {
    items.into_iter().collect::<Vec<_>>().join("\n")
}

// ── MPEG audio ────────────────────────────────────────────────────────────────

#[test]
fn mpeg_header_display() {
    let (common, _) = MpegAudioHeader::parse(&[0xFF, 0xFB, 0x90, 0x64])
        .into_result()
        .unwrap();
    let headers = [
        common,
        header(MpegVersion::V2, MpegLayer::III, 8, 2, ChannelMode::SingleChannel)
            .with_protection(true),
        header(MpegVersion::V1, MpegLayer::II, 8, 1, ChannelMode::DualChannel)
            .with_padding(true)
            .with_emphasis(Emphasis::Ms50_15),
        header(MpegVersion::V1, MpegLayer::I, 14, 2, ChannelMode::JointStereo)
            .with_mode_extension(0b01)
            .with_copyright(true),
        header(MpegVersion::V2_5, MpegLayer::III, 0, 0, ChannelMode::Stereo),
    ];
    let output = lines(headers.iter().map(ToString::to_string));
    assert_snapshot!("mpeg_header_display", output);
}

// ── GZIP ──────────────────────────────────────────────────────────────────────

#[test]
fn gzip_reference_member() {
    let member = fixtures::gzip_hello();
    let (header, consumed) = GzipHeader::parse(&member).into_result().unwrap();
    let (trailer, _) = GzipTrailer::parse(&member[member.len() - 8..])
        .into_result()
        .unwrap();

    let mut output = String::new();
    writeln!(output, "header length: {consumed}").unwrap();
    writeln!(output, "flags: {:#010b}", header.flags().raw()).unwrap();
    writeln!(output, "mtime: {}", header.mtime).unwrap();
    writeln!(output, "xfl: {}", header.xfl).unwrap();
    writeln!(output, "os: {}", header.os).unwrap();
    writeln!(
        output,
        "filename: {}",
        header.filename.as_deref().map(latin1).unwrap_or_default()
    )
    .unwrap();
    writeln!(output, "deflate bytes: {}", member.len() - consumed - 8).unwrap();
    writeln!(output, "crc32: {:#010X}", trailer.crc32).unwrap();
    write!(output, "isize: {}", trailer.isize).unwrap();
    assert_snapshot!("gzip_reference_member", output);
}

// ── RIFF / AVI ────────────────────────────────────────────────────────────────

#[test]
fn avi_hdrl_walk() {
    let list = AviHeaderList::find_in_file(&fixtures::avi_file()).unwrap();
    let main = &list.main;

    let mut rows = vec![format!(
        "avih {}x{}, {} frames @ {} us, {} streams, flags {}",
        main.width,
        main.height,
        main.total_frames,
        main.micro_sec_per_frame,
        main.streams,
        main.flags.names().join("|")
    )];
    for entry in &list.entries {
        rows.push(match entry {
            HdrlEntry::Stream(stream) => {
                let chunks: Vec<String> = stream
                    .chunks
                    .iter()
                    .map(|c| format!("{} ({} bytes)", c.tag, c.body.len()))
                    .collect();
                format!("strl: {}", chunks.join(", "))
            }
            HdrlEntry::Other(chunk) => format!("{} ({} bytes)", chunk.tag, chunk.body.len()),
        });
    }
    rows.push(format!(
        "duration: {:.3} s",
        main.total_duration().as_secs_f64()
    ));
    assert_snapshot!("avi_hdrl_walk", lines(rows));
}

// ── ID3v2 ─────────────────────────────────────────────────────────────────────

#[test]
fn id3_tag_frames() {
    let bytes = fixtures::tagged_mpeg_stream(1);
    let (tag, consumed) = Id3v2Tag::parse(&bytes).into_result().unwrap();

    let mut rows = vec![format!(
        "ID3v2.{}.{} size {} (tag {} bytes)",
        tag.header.version, tag.header.revision, tag.header.size, consumed
    )];
    for frame in &tag.frames {
        rows.push(format!(
            "{} [{} bytes] {}",
            frame.id(),
            frame.data.len(),
            frame.text().unwrap_or_default()
        ));
    }
    rows.push(format!("padding: {}", tag.padding));
    let (first, _) = MpegAudioFrame::parse(&bytes[consumed..]).into_result().unwrap();
    rows.push(format!("first frame: {}", first.header));
    assert_snapshot!("id3_tag_frames", lines(rows));
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[test]
fn error_messages() {
    let mut flipped = GzipHeader::new()
        .with_mtime(0x1234_5678)
        .with_os(OperatingSystem::Unix)
        .with_header_crc(true)
        .encode()
        .unwrap();
    flipped[4] ^= 0xFF;
    let hdrl = fixtures::avi_header_list().encode().unwrap();
    let free = header(MpegVersion::V1, MpegLayer::III, 0, 0, ChannelMode::Stereo).to_bytes();

    let errors = [
        GzipHeader::parse(&[0x1F, 0x8C]).into_result().map(|_| ()),
        GzipHeader::parse(&[0x1F, 0x8B, 0x07]).into_result().map(|_| ()),
        GzipHeader::parse(&[0x1F, 0x8B]).into_result().map(|_| ()),
        GzipHeader::parse(&flipped).into_result().map(|_| ()),
        AviHeaderList::parse_region(&hdrl[..100]).map(|_| ()),
        Id3v2Header::parse(b"ID3\x04").into_result().map(|_| ()),
        MpegAudioFrame::parse(&free).into_result().map(|_| ()),
        MpegAudioHeader::parse(&[0xFF, 0xFB, 0xF0]).into_result().map(|_| ()),
    ];
    let output = lines(errors.into_iter().map(|r| match r {
        Ok(()) => "ok".to_string(),
        Err(e) => e.to_string(),
    }));
    assert_snapshot!("error_messages", output);
}
