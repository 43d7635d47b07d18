//! ID3v2 tag header, ID3v2.3 frame headers and a tag walker.
//!
//! ```text
//! ┌──────────────┬─────────┬──────────┬───────┬──────────────────────┐
//! │ "ID3"        │ version │ revision │ flags │ size (synchsafe, 4)  │  10 bytes
//! └──────────────┴─────────┴──────────┴───────┴──────────────────────┘
//!   [extended header]  [frame]*  [padding: zero bytes]  [footer]
//!   ◄──────────────────── size ────────────────────►
//! ```
//!
//! The size excludes the 10-byte header and the optional 10-byte footer.
//! Versions and revisions above the supported ones are rejected; lower
//! ones are accepted.

use hdrkit_wire::binary_io::{read_u8, read_u32_be};
use hdrkit_wire::synchsafe::{decode_synchsafe, encode_synchsafe};
use hdrkit_wire::{HeaderCodec, ParseStatus};
use tracing::{debug, trace};

use crate::Parse;
use crate::error::FormatError;
use crate::gzip::latin1;
use crate::riff::FourCc;

pub const MAGIC: &[u8; 3] = b"ID3";
pub const FOOTER_MAGIC: &[u8; 3] = b"3DI";
pub const SUPPORTED_VERSION: u8 = 3;
pub const SUPPORTED_REVISION: u8 = 0;

const FORMAT: &str = "id3v2";

// ── Tag header ────────────────────────────────────────────────────────

/// The tag header flags byte.
///
/// Bit layout:
///   bit 7 = unsynchronisation applied to the whole tag
///   bit 6 = extended header present
///   bit 5 = experimental
///   bit 4 = footer present
///   bits 0-3 = unused, kept as read
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Id3v2Flags(u8);

impl Id3v2Flags {
    pub const NONE: Self = Self(0);
    pub const UNSYNCHRONISATION: Self = Self(0x80);
    pub const EXTENDED_HEADER: Self = Self(0x40);
    pub const EXPERIMENTAL: Self = Self(0x20);
    pub const FOOTER: Self = Self(0x10);

    pub fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn with(self, other: Self, on: bool) -> Self {
        if on {
            Self(self.0 | other.0)
        } else {
            Self(self.0 & !other.0)
        }
    }
}

/// The fixed 10-byte ID3v2 tag header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Id3v2Header {
    pub version: u8,
    pub revision: u8,
    pub flags: Id3v2Flags,
    /// Bytes after the header, footer excluded. At most 2^28 − 1.
    pub size: u32,
}

impl Id3v2Header {
    pub const LEN: usize = 10;
    pub const FOOTER_LEN: usize = 10;

    /// A v2.3.0 header with no flags.
    pub fn new(size: u32) -> Self {
        Self {
            version: SUPPORTED_VERSION,
            revision: SUPPORTED_REVISION,
            flags: Id3v2Flags::NONE,
            size,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: Id3v2Flags) -> Self {
        self.flags = flags;
        self
    }

    pub fn has_footer(&self) -> bool {
        self.flags.contains(Id3v2Flags::FOOTER)
    }

    /// Header, body and footer: how far the tag reaches into the stream.
    pub fn total_size(&self) -> usize {
        let footer = if self.has_footer() { Self::FOOTER_LEN } else { 0 };
        Self::LEN + self.size as usize + footer
    }

    /// Check whatever prefix of the header is available.
    fn check_prefix(buf: &[u8]) -> Result<(), FormatError> {
        for (i, (&actual, &expected)) in buf.iter().zip(MAGIC).enumerate() {
            if actual != expected {
                return Err(FormatError::malformed(
                    FORMAT,
                    format!("magic byte {i} is {actual:#04X}, expected {expected:#04X}"),
                ));
            }
        }
        if let Some(&version) = buf.get(3) {
            if version > SUPPORTED_VERSION {
                return Err(FormatError::UnsupportedVariant {
                    field: "id3v2 version",
                    value: u32::from(version),
                });
            }
        }
        if let Some(&revision) = buf.get(4) {
            if revision > SUPPORTED_REVISION {
                return Err(FormatError::UnsupportedVariant {
                    field: "id3v2 revision",
                    value: u32::from(revision),
                });
            }
        }
        Ok(())
    }
}

impl HeaderCodec for Id3v2Header {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        if let Err(e) = Self::check_prefix(buf) {
            return ParseStatus::Invalid(e);
        }
        if buf.len() < Self::LEN {
            return ParseStatus::NeedMore(Self::LEN - buf.len());
        }
        let result = (|| {
            let header = Self {
                version: buf[3],
                revision: buf[4],
                flags: Id3v2Flags::from_raw(read_u8(buf, 5)?),
                size: decode_synchsafe(&buf[6..])?,
            };
            Ok::<_, FormatError>((header, Self::LEN))
        })();
        result.into()
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        let size = encode_synchsafe(self.size)?;
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[self.version, self.revision, self.flags.raw()]);
        out.extend_from_slice(&size);
        Ok(Self::LEN)
    }
}

// ── Frame header (v2.3) ───────────────────────────────────────────────

/// First flags byte of an ID3v2.3 frame: what to do on modification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStatusFlags(u8);

impl FrameStatusFlags {
    pub const TAG_ALTER_DISCARD: Self = Self(0x80);
    pub const FILE_ALTER_DISCARD: Self = Self(0x40);
    pub const READ_ONLY: Self = Self(0x20);

    pub fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Second flags byte of an ID3v2.3 frame: how the data is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameFormatFlags(u8);

impl FrameFormatFlags {
    pub const COMPRESSION: Self = Self(0x80);
    pub const ENCRYPTION: Self = Self(0x40);
    pub const GROUPING: Self = Self(0x20);

    pub fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// The 10-byte header of an ID3v2.3 frame.
///
/// ```text
/// ┌──────────────┬────────────────┬────────┬────────┐
/// │ id (4 chars) │ size (u32 BE)  │ status │ format │
/// └──────────────┴────────────────┴────────┴────────┘
/// ```
///
/// Unlike the tag header, the v2.3 frame size is a plain big-endian
/// integer, not synchsafe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Id3FrameHeader {
    pub id: FourCc,
    pub size: u32,
    pub status: FrameStatusFlags,
    pub format: FrameFormatFlags,
}

impl Id3FrameHeader {
    pub const LEN: usize = 10;

    pub fn new(id: FourCc, size: u32) -> Self {
        Self {
            id,
            size,
            status: FrameStatusFlags::default(),
            format: FrameFormatFlags::default(),
        }
    }
}

fn is_frame_id_byte(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit()
}

impl HeaderCodec for Id3FrameHeader {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        if let Some(&bad) = buf.iter().take(4).find(|&&b| !is_frame_id_byte(b)) {
            return ParseStatus::Invalid(FormatError::malformed(
                FORMAT,
                format!("frame id contains {bad:#04X}"),
            ));
        }
        if buf.len() < Self::LEN {
            return ParseStatus::NeedMore(Self::LEN - buf.len());
        }
        let result = (|| {
            let header = Self {
                id: FourCc([buf[0], buf[1], buf[2], buf[3]]),
                size: read_u32_be(buf, 4)?,
                status: FrameStatusFlags::from_raw(read_u8(buf, 8)?),
                format: FrameFormatFlags::from_raw(read_u8(buf, 9)?),
            };
            Ok::<_, FormatError>((header, Self::LEN))
        })();
        result.into()
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        if let Some(&bad) = self.id.0.iter().find(|&&b| !is_frame_id_byte(b)) {
            return Err(FormatError::malformed(
                FORMAT,
                format!("frame id contains {bad:#04X}"),
            ));
        }
        out.extend_from_slice(self.id.as_bytes());
        out.extend_from_slice(&self.size.to_be_bytes());
        out.extend_from_slice(&[self.status.raw(), self.format.raw()]);
        Ok(Self::LEN)
    }
}

// ── Tag ───────────────────────────────────────────────────────────────

/// One frame: header fields plus its opaque data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Id3Frame {
    pub header: Id3FrameHeader,
    pub data: Vec<u8>,
}

impl Id3Frame {
    /// # Errors
    ///
    /// `MalformedHeader` if `data` is longer than a u32 size can state.
    pub fn new(id: FourCc, data: Vec<u8>) -> Result<Self, FormatError> {
        let size = u32::try_from(data.len())
            .map_err(|_| FormatError::malformed(FORMAT, "frame data exceeds u32::MAX bytes"))?;
        Ok(Self {
            header: Id3FrameHeader::new(id, size),
            data,
        })
    }

    /// A text frame (`T???`, except `TXXX`) in ISO-8859-1.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn text_latin1(id: FourCc, text: &str) -> Result<Self, FormatError> {
        let mut data = vec![0u8];
        for c in text.chars() {
            let byte = u8::try_from(u32::from(c))
                .map_err(|_| FormatError::malformed(FORMAT, format!("{c:?} is not ISO-8859-1")))?;
            data.push(byte);
        }
        Self::new(id, data)
    }

    pub fn id(&self) -> FourCc {
        self.header.id
    }

    pub fn total_len(&self) -> usize {
        Id3FrameHeader::LEN + self.data.len()
    }

    /// Decode a text information frame. `None` for other frames, for
    /// compressed or encrypted data and for unknown text encodings.
    pub fn text(&self) -> Option<String> {
        let id = self.header.id.0;
        if id[0] != b'T' || &id == b"TXXX" {
            return None;
        }
        let format = self.header.format;
        if format.contains(FrameFormatFlags::COMPRESSION)
            || format.contains(FrameFormatFlags::ENCRYPTION)
        {
            return None;
        }
        let (&encoding, body) = self.data.split_first()?;
        match encoding {
            0 => Some(latin1(trim_nul(body, 1))),
            1 => decode_utf16_bom(trim_nul(body, 2)),
            _ => None,
        }
    }
}

/// Drop trailing NUL code units of `width` bytes.
fn trim_nul(mut body: &[u8], width: usize) -> &[u8] {
    while body.len() >= width && body[body.len() - width..].iter().all(|&b| b == 0) {
        body = &body[..body.len() - width];
    }
    body
}

fn decode_utf16_bom(body: &[u8]) -> Option<String> {
    let (bom, rest) = body.split_at_checked(2)?;
    let big_endian = match bom {
        [0xFE, 0xFF] => true,
        [0xFF, 0xFE] => false,
        _ => return None,
    };
    let units: Vec<u16> = rest
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if big_endian {
                u16::from_be_bytes(pair)
            } else {
                u16::from_le_bytes(pair)
            }
        })
        .collect();
    Some(String::from_utf16_lossy(&units))
}

/// A whole ID3v2.3 tag: header, optional extended header, frames, padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Id3v2Tag {
    pub header: Id3v2Header,
    /// Raw extended header, size field included.
    pub extended_header: Option<Vec<u8>>,
    pub frames: Vec<Id3Frame>,
    /// Zero bytes after the last frame.
    pub padding: usize,
}

impl Id3v2Tag {
    pub fn new() -> Self {
        Self {
            header: Id3v2Header::new(0),
            extended_header: None,
            frames: Vec::new(),
            padding: 0,
        }
    }

    #[must_use]
    pub fn with_frame(mut self, frame: Id3Frame) -> Self {
        self.frames.push(frame);
        self
    }

    #[must_use]
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// First frame with the given id.
    pub fn frame(&self, id: FourCc) -> Option<&Id3Frame> {
        self.frames.iter().find(|f| f.id() == id)
    }

    /// Body length the header's size field must state.
    pub fn body_len(&self) -> usize {
        self.extended_header.as_ref().map_or(0, Vec::len)
            + self.frames.iter().map(Id3Frame::total_len).sum::<usize>()
            + self.padding
    }

    fn parse_body(header: Id3v2Header, body: &[u8]) -> Result<Self, FormatError> {
        let mut pos = 0;
        let mut extended_header = None;
        if header.flags.contains(Id3v2Flags::EXTENDED_HEADER) {
            let ext_size = read_u32_be(body, 0)
                .map_err(|_| FormatError::malformed(FORMAT, "extended header overruns tag"))?;
            let ext_len = (ext_size as usize).saturating_add(4);
            let ext = body
                .get(..ext_len)
                .ok_or_else(|| FormatError::malformed(FORMAT, "extended header overruns tag"))?;
            trace!(ext_len, "skipped id3v2 extended header");
            extended_header = Some(ext.to_vec());
            pos = ext_len;
        }

        let mut frames = Vec::new();
        while pos < body.len() {
            if body[pos] == 0 {
                break;
            }
            let offset = Id3v2Header::LEN + pos;
            let frame_header = match Id3FrameHeader::parse(&body[pos..]) {
                ParseStatus::Complete { value, .. } => value,
                ParseStatus::NeedMore(_) => {
                    return Err(FormatError::malformed(FORMAT, "frame header overruns tag")
                        .at(offset, "id3v2 frame"));
                }
                ParseStatus::Invalid(e) => return Err(e.at(offset, "id3v2 frame")),
            };
            let data_start = pos + Id3FrameHeader::LEN;
            let data = body
                .get(data_start..)
                .and_then(|rest| rest.get(..frame_header.size as usize))
                .ok_or_else(|| {
                    FormatError::malformed(
                        FORMAT,
                        format!(
                            "frame '{}' declares {} byte(s) past the end of the tag",
                            frame_header.id, frame_header.size
                        ),
                    )
                    .at(offset, "id3v2 frame")
                })?;
            trace!(id = %frame_header.id, size = frame_header.size, offset, "id3v2 frame");
            frames.push(Id3Frame {
                header: frame_header,
                data: data.to_vec(),
            });
            pos = data_start + data.len();
        }

        let padding = body.len() - pos;
        if let Some(&bad) = body[pos..].iter().find(|&&b| b != 0) {
            return Err(FormatError::malformed(
                FORMAT,
                format!("non-zero byte {bad:#04X} in padding"),
            ));
        }
        debug!(frames = frames.len(), padding, "walked id3v2 tag");
        Ok(Self {
            header,
            extended_header,
            frames,
            padding,
        })
    }
}

impl Default for Id3v2Tag {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderCodec for Id3v2Tag {
    type Error = FormatError;

    /// Needs the whole tag in `buf`; `NeedMore` counts up to its end.
    fn parse(buf: &[u8]) -> Parse<Self> {
        let header = match Id3v2Header::parse(buf) {
            ParseStatus::Complete { value, .. } => value,
            ParseStatus::NeedMore(n) => return ParseStatus::NeedMore(n),
            ParseStatus::Invalid(e) => return ParseStatus::Invalid(e),
        };
        let total = header.total_size();
        if buf.len() < total {
            return ParseStatus::NeedMore(total - buf.len());
        }
        if header.version != SUPPORTED_VERSION {
            return ParseStatus::Invalid(FormatError::UnsupportedVariant {
                field: "id3v2 frame layout",
                value: u32::from(header.version),
            });
        }
        if header.flags.contains(Id3v2Flags::UNSYNCHRONISATION) {
            return ParseStatus::Invalid(FormatError::UnsupportedVariant {
                field: "id3v2 unsynchronisation",
                value: 1,
            });
        }
        let body = &buf[Id3v2Header::LEN..Id3v2Header::LEN + header.size as usize];
        match Self::parse_body(header, body) {
            Ok(tag) => ParseStatus::Complete {
                value: tag,
                consumed: total,
            },
            Err(e) => ParseStatus::Invalid(e),
        }
    }

    /// The header's size field is recomputed from the contents.
    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        let size = u32::try_from(self.body_len())
            .map_err(|_| FormatError::malformed(FORMAT, "tag body exceeds u32::MAX bytes"))?;
        let header = Id3v2Header { size, ..self.header };
        let start = out.len();
        let mut encoded_header = Vec::with_capacity(Id3v2Header::LEN);
        header.write_to(&mut encoded_header)?;
        out.extend_from_slice(&encoded_header);
        if let Some(ext) = &self.extended_header {
            out.extend_from_slice(ext);
        }
        for frame in &self.frames {
            let frame_size = u32::try_from(frame.data.len())
                .map_err(|_| FormatError::malformed(FORMAT, "frame data exceeds u32::MAX bytes"))?;
            if let Err(e) = (Id3FrameHeader {
                size: frame_size,
                ..frame.header
            })
            .write_to(out)
            {
                out.truncate(start);
                return Err(e);
            }
            out.extend_from_slice(&frame.data);
        }
        out.resize(out.len() + self.padding, 0);
        if header.has_footer() {
            out.extend_from_slice(FOOTER_MAGIC);
            out.extend_from_slice(&encoded_header[3..]);
        }
        Ok(out.len() - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIT2: FourCc = FourCc(*b"TIT2");
    const TPE1: FourCc = FourCc(*b"TPE1");

    #[test]
    fn header_size_1000() {
        let header = Id3v2Header::new(1000);
        let bytes = header.encode().unwrap();
        assert_eq!(bytes, b"ID3\x03\x00\x00\x00\x00\x07\x68");
        match Id3v2Header::parse(&bytes) {
            ParseStatus::Complete { value, consumed } => {
                assert_eq!(consumed, 10);
                assert_eq!(value.size, 1000);
                assert_eq!(value.total_size(), 1010);
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn footer_adds_ten_bytes() {
        let header = Id3v2Header::new(1000).with_flags(Id3v2Flags::FOOTER);
        assert_eq!(header.total_size(), 1020);
    }

    #[test]
    fn newer_version_rejected_older_accepted() {
        assert!(matches!(
            Id3v2Header::parse(b"ID3\x04\x00\x00\x00\x00\x00\x00"),
            ParseStatus::Invalid(FormatError::UnsupportedVariant { value: 4, .. })
        ));
        assert!(matches!(
            Id3v2Header::parse(b"ID3\x03\x01"),
            ParseStatus::Invalid(FormatError::UnsupportedVariant {
                field: "id3v2 revision",
                value: 1
            })
        ));
        assert!(Id3v2Header::parse(b"ID3\x02\x00\x00\x00\x00\x00\x00").is_complete());
    }

    #[test]
    fn magic_checked_on_prefix() {
        assert!(Id3v2Header::parse(b"IX").is_invalid());
        assert!(matches!(Id3v2Header::parse(b"ID"), ParseStatus::NeedMore(8)));
    }

    #[test]
    fn non_synchsafe_size_rejected() {
        assert!(matches!(
            Id3v2Header::parse(b"ID3\x03\x00\x00\x00\x00\x80\x00"),
            ParseStatus::Invalid(FormatError::Wire(_))
        ));
    }

    #[test]
    fn frame_header_roundtrip() {
        let mut header = Id3FrameHeader::new(TIT2, 0x0102);
        header.status = FrameStatusFlags::from_raw(0x40);
        header.format = FrameFormatFlags::from_raw(0x20);
        let bytes = header.encode().unwrap();
        assert_eq!(bytes, b"TIT2\x00\x00\x01\x02\x40\x20");
        let (parsed, _) = Id3FrameHeader::parse(&bytes).complete().unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.status.contains(FrameStatusFlags::FILE_ALTER_DISCARD));
        assert!(parsed.format.contains(FrameFormatFlags::GROUPING));
    }

    #[test]
    fn tag_roundtrip_with_padding() {
        let tag = Id3v2Tag::new()
            .with_frame(Id3Frame::text_latin1(TIT2, "Intro").unwrap())
            .with_frame(Id3Frame::text_latin1(TPE1, "Band").unwrap())
            .with_padding(16);
        let bytes = tag.encode().unwrap();
        // 2 frames of 10 + 6 and 10 + 5, plus padding
        assert_eq!(bytes.len(), 10 + 16 + 15 + 16);

        let (parsed, consumed) = Id3v2Tag::parse(&bytes).complete().unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed.header.size, 47);
        assert_eq!(parsed.frames.len(), 2);
        assert_eq!(parsed.padding, 16);
        assert_eq!(parsed.frame(TIT2).and_then(Id3Frame::text).as_deref(), Some("Intro"));
        assert_eq!(parsed.encode().unwrap(), bytes);
    }

    #[test]
    fn extended_header_is_skipped() {
        let mut bytes = Id3v2Header::new(10 + 15)
            .with_flags(Id3v2Flags::EXTENDED_HEADER)
            .encode()
            .unwrap();
        bytes.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(b"TPE1\x00\x00\x00\x05\x00\x00\x00Band");

        let (tag, _) = Id3v2Tag::parse(&bytes).complete().unwrap();
        assert_eq!(tag.extended_header.as_ref().map(Vec::len), Some(10));
        assert_eq!(tag.frames.len(), 1);
        assert_eq!(tag.frames[0].text().as_deref(), Some("Band"));
    }

    #[test]
    fn utf16_text() {
        let frame = Id3Frame::new(TIT2, vec![1, 0xFF, 0xFE, b'h', 0, b'i', 0, 0, 0]).unwrap();
        assert_eq!(frame.text().as_deref(), Some("hi"));
    }

    #[test]
    fn incomplete_tag_asks_for_the_rest() {
        let bytes = Id3v2Tag::new().with_padding(100).encode().unwrap();
        assert!(matches!(
            Id3v2Tag::parse(&bytes[..30]),
            ParseStatus::NeedMore(80)
        ));
    }

    #[test]
    fn frame_overrunning_tag_is_malformed() {
        let mut bytes = Id3v2Header::new(12).encode().unwrap();
        bytes.extend_from_slice(b"TIT2\x00\x00\x00\x09\x00\x00\x00T");
        let ParseStatus::Invalid(err) = Id3v2Tag::parse(&bytes) else {
            panic!("expected Invalid");
        };
        assert!(matches!(err, FormatError::At { offset: 10, .. }));
        assert!(matches!(err.root(), FormatError::MalformedHeader { .. }));
    }
}
