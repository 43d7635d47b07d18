//! RIFF chunk and list framing.
//!
//! ```text
//! chunk:  ┌────────┬───────────┬──────────────────────┬─────┐
//!         │ FOURCC │ size (LE) │ body [size bytes]    │ pad │  pad iff size is odd
//!         └────────┴───────────┴──────────────────────┴─────┘
//! list:   ┌────────┬───────────┬───────────┬───────────────────┐
//!         │ "LIST" │ size (LE) │ list type │ chunks...         │  size counts type + chunks
//!         └────────┴───────────┴───────────┴───────────────────┘
//! ```
//!
//! A RIFF file is a list whose tag is `"RIFF"` instead of `"LIST"` and
//! whose list type is the form (`"AVI "`, `"WAVE"`).

use std::fmt;

use hdrkit_wire::binary_io::{read_bytes, read_u32_le};
use hdrkit_wire::{HeaderCodec, ParseStatus, WireError};

use crate::Parse;
use crate::error::FormatError;

const FORMAT: &str = "riff";

// ── FOURCC ────────────────────────────────────────────────────────────

/// A four-character chunk tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const RIFF: Self = Self(*b"RIFF");
    pub const LIST: Self = Self(*b"LIST");
    pub const AVI: Self = Self(*b"AVI ");
    pub const HDRL: Self = Self(*b"hdrl");
    pub const AVIH: Self = Self(*b"avih");
    pub const STRL: Self = Self(*b"strl");
    pub const STRH: Self = Self(*b"strh");
    pub const STRF: Self = Self(*b"strf");
    pub const JUNK: Self = Self(*b"JUNK");

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for FourCc {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

/// Printable ASCII as-is, anything else as `\xNN`.
impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", char::from(b))?;
            } else {
                write!(f, "\\x{b:02X}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc(\"{self}\")")
    }
}

// ── Chunk header ──────────────────────────────────────────────────────

/// The 8-byte header in front of every chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: FourCc,
    /// Body length, excluding this header and the pad byte.
    pub size: u32,
}

impl ChunkHeader {
    pub const LEN: usize = 8;

    pub fn new(tag: FourCc, size: u32) -> Self {
        Self { tag, size }
    }

    pub fn body_len(&self) -> usize {
        self.size as usize
    }

    /// Body length rounded up to the 2-byte word boundary.
    pub fn padded_body_len(&self) -> usize {
        self.body_len() + (self.body_len() & 1)
    }

    /// Header plus padded body.
    pub fn total_len(&self) -> usize {
        Self::LEN + self.padded_body_len()
    }

    /// Whether the declared body fits in `remaining` bytes after the header.
    pub fn is_valid(&self, remaining: usize) -> bool {
        self.body_len() <= remaining
    }

    /// Like [`is_valid`](Self::is_valid), as an error carrying `offset`.
    ///
    /// # Errors
    ///
    /// `TruncatedContainer` if the body overruns `remaining`.
    pub fn check_fits(&self, offset: usize, remaining: usize) -> Result<(), FormatError> {
        if self.is_valid(remaining) {
            Ok(())
        } else {
            Err(FormatError::TruncatedContainer {
                tag: self.tag,
                offset,
                declared: u64::from(self.size),
                available: remaining,
            })
        }
    }
}

impl HeaderCodec for ChunkHeader {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        if buf.len() < Self::LEN {
            return ParseStatus::NeedMore(Self::LEN - buf.len());
        }
        let result = (|| {
            let header = ChunkHeader {
                tag: FourCc(read_bytes(buf, 0)?),
                size: read_u32_le(buf, 4)?,
            };
            Ok::<_, FormatError>((header, Self::LEN))
        })();
        result.into()
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        out.extend_from_slice(self.tag.as_bytes());
        out.extend_from_slice(&self.size.to_le_bytes());
        Ok(Self::LEN)
    }
}

// ── Lists ─────────────────────────────────────────────────────────────

/// Shared decoder for the two 12-byte list-style headers.
///
/// The tag is checked against whatever prefix is available, so a wrong
/// tag is `Invalid` even from a 1-byte buffer.
fn parse_list_like(buf: &[u8], tag: FourCc) -> Parse<(u32, FourCc)> {
    if let Some(pos) = buf.iter().zip(tag.as_bytes()).position(|(a, b)| a != b) {
        return ParseStatus::Invalid(FormatError::malformed(
            FORMAT,
            format!(
                "expected '{tag}' tag, byte {pos} is {:#04X}",
                buf[pos]
            ),
        ));
    }
    if buf.len() < ListHeader::LEN {
        return ParseStatus::NeedMore(ListHeader::LEN - buf.len());
    }
    let size = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    if size < 4 {
        return ParseStatus::Invalid(FormatError::malformed(
            FORMAT,
            format!("'{tag}' size {size} too small to hold a list type"),
        ));
    }
    let list_type = FourCc([buf[8], buf[9], buf[10], buf[11]]);
    ParseStatus::Complete {
        value: (size, list_type),
        consumed: ListHeader::LEN,
    }
}

/// A `"LIST"` chunk header plus its list type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListHeader {
    /// Declared size: the 4-byte list type plus every nested chunk.
    pub size: u32,
    pub list_type: FourCc,
}

impl ListHeader {
    pub const LEN: usize = 12;

    /// Build a list header around `content_len` bytes of nested chunks.
    ///
    /// # Errors
    ///
    /// `ValueOutOfRange` if the size would not fit the 32-bit field.
    pub fn for_content(list_type: FourCc, content_len: usize) -> Result<Self, FormatError> {
        Ok(Self {
            size: size_field(content_len + 4)?,
            list_type,
        })
    }

    /// Bytes of nested chunks after the list type.
    pub fn content_len(&self) -> usize {
        (self.size as usize).saturating_sub(4)
    }

    pub fn chunk_header(&self) -> ChunkHeader {
        ChunkHeader::new(FourCc::LIST, self.size)
    }
}

impl HeaderCodec for ListHeader {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        parse_list_like(buf, FourCc::LIST).map(|(size, list_type)| Self { size, list_type })
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        out.extend_from_slice(FourCc::LIST.as_bytes());
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(self.list_type.as_bytes());
        Ok(Self::LEN)
    }
}

/// The `"RIFF"` header that opens a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiffFormHeader {
    pub size: u32,
    pub form_type: FourCc,
}

impl RiffFormHeader {
    pub const LEN: usize = 12;
}

impl HeaderCodec for RiffFormHeader {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        parse_list_like(buf, FourCc::RIFF).map(|(size, form_type)| Self { size, form_type })
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        out.extend_from_slice(FourCc::RIFF.as_bytes());
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(self.form_type.as_bytes());
        Ok(Self::LEN)
    }
}

pub(crate) fn size_field(len: usize) -> Result<u32, FormatError> {
    u32::try_from(len).map_err(|_| {
        WireError::ValueOutOfRange {
            what: "riff chunk size",
            value: len as u64,
            max: u64::from(u32::MAX),
        }
        .into()
    })
}

// ── Raw chunks ────────────────────────────────────────────────────────

/// A chunk whose body is kept as opaque bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawChunk {
    pub tag: FourCc,
    pub body: Vec<u8>,
}

impl RawChunk {
    /// # Errors
    ///
    /// `ValueOutOfRange` if `body` is 4 GiB or larger.
    pub fn new(tag: FourCc, body: impl Into<Vec<u8>>) -> Result<Self, FormatError> {
        let body = body.into();
        size_field(body.len())?;
        Ok(Self { tag, body })
    }

    pub fn header(&self) -> ChunkHeader {
        #[allow(clippy::cast_possible_truncation)]
        let size = self.body.len() as u32;
        ChunkHeader::new(self.tag, size)
    }

    /// Encoded length including header and pad byte.
    pub fn total_len(&self) -> usize {
        self.header().total_len()
    }
}

impl HeaderCodec for RawChunk {
    type Error = FormatError;

    /// Needs the pad byte of an odd-sized body to complete.
    fn parse(buf: &[u8]) -> Parse<Self> {
        let header = match ChunkHeader::parse(buf) {
            ParseStatus::Complete { value, .. } => value,
            ParseStatus::NeedMore(n) => return ParseStatus::NeedMore(n),
            ParseStatus::Invalid(e) => return ParseStatus::Invalid(e),
        };
        let total = header.total_len();
        if buf.len() < total {
            return ParseStatus::NeedMore(total - buf.len());
        }
        ParseStatus::Complete {
            value: RawChunk {
                tag: header.tag,
                body: buf[ChunkHeader::LEN..ChunkHeader::LEN + header.body_len()].to_vec(),
            },
            consumed: total,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        let size = size_field(self.body.len())?;
        ChunkHeader::new(self.tag, size).write_to(out)?;
        out.extend_from_slice(&self.body);
        if self.body.len() % 2 == 1 {
            out.push(0);
        }
        Ok(self.total_len())
    }
}

// ── Walking a region ──────────────────────────────────────────────────

/// One chunk found by [`ChunkIter`], borrowed from the region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRef<'a> {
    /// Offset of the chunk header, relative to the start of the walk.
    pub offset: usize,
    pub header: ChunkHeader,
    pub body: &'a [u8],
}

impl ChunkRef<'_> {
    /// The list type, if this chunk is a `"LIST"`.
    pub fn list_type(&self) -> Option<FourCc> {
        if self.header.tag != FourCc::LIST {
            return None;
        }
        read_bytes::<4>(self.body, 0).ok().map(FourCc)
    }

    pub fn to_raw(&self) -> RawChunk {
        RawChunk {
            tag: self.header.tag,
            body: self.body.to_vec(),
        }
    }
}

/// Walks consecutive chunks through a bounded region.
///
/// Every step re-checks the remaining byte budget. A chunk whose declared
/// size overruns the region yields one `TruncatedContainer` and ends the
/// walk. A pad byte is skipped when the region still holds it.
#[derive(Clone, Debug)]
pub struct ChunkIter<'a> {
    region: &'a [u8],
    pos: usize,
    base: usize,
    failed: bool,
}

impl<'a> ChunkIter<'a> {
    pub fn new(region: &'a [u8]) -> Self {
        Self::with_base(region, 0)
    }

    /// Report offsets relative to `base` instead of the region start.
    pub fn with_base(region: &'a [u8], base: usize) -> Self {
        Self {
            region,
            pos: 0,
            base,
            failed: false,
        }
    }

    /// Offset of the next chunk header, relative to `base`.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<ChunkRef<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.region.len() {
            return None;
        }
        let rest = &self.region[self.pos..];
        let offset = self.base + self.pos;

        let header = match ChunkHeader::parse(rest) {
            ParseStatus::Complete { value, .. } => value,
            ParseStatus::NeedMore(_) => {
                self.failed = true;
                return Some(Err(FormatError::malformed(
                    FORMAT,
                    format!(
                        "{} trailing byte(s) at offset {offset} cannot hold a chunk header",
                        rest.len()
                    ),
                )));
            }
            ParseStatus::Invalid(e) => {
                self.failed = true;
                return Some(Err(e));
            }
        };

        let remaining = rest.len() - ChunkHeader::LEN;
        if let Err(e) = header.check_fits(offset, remaining) {
            self.failed = true;
            return Some(Err(e));
        }

        let body = &rest[ChunkHeader::LEN..ChunkHeader::LEN + header.body_len()];
        self.pos += ChunkHeader::LEN + header.body_len();
        if header.body_len() % 2 == 1 && self.pos < self.region.len() {
            self.pos += 1;
        }
        Some(Ok(ChunkRef {
            offset,
            header,
            body,
        }))
    }
}
