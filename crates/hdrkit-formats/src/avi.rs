//! The AVI `"hdrl"` header list.
//!
//! ```text
//! LIST 'hdrl'
//! ├── 'avih'        main header, 56-byte body
//! ├── LIST 'strl'   one per stream
//! │   ├── 'strh'    stream header (kept opaque)
//! │   ├── 'strf'    stream format (kept opaque)
//! │   └── ...       'strd', 'strn', 'indx'
//! ├── LIST 'strl'
//! │   └── ...
//! └── 'JUNK', LIST 'odml', ...   preserved as opaque chunks
//! ```
//!
//! Stream header and format bodies stay raw bytes. The `movi` list and the
//! index are not decoded at all.

use std::time::Duration;

use hdrkit_wire::binary_io::read_u32_le;
use hdrkit_wire::{HeaderCodec, ParseStatus};
use tracing::{debug, warn};

use crate::Parse;
use crate::error::FormatError;
use crate::riff::{
    ChunkHeader, ChunkIter, ChunkRef, FourCc, ListHeader, RawChunk, RiffFormHeader, size_field,
};

const FORMAT: &str = "avi";

// ── Flags ─────────────────────────────────────────────────────────────

/// `dwFlags` of the main header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AviFlags(u32);

impl AviFlags {
    pub const NONE: Self = Self(0);
    pub const HAS_INDEX: Self = Self(0x0000_0010);
    pub const MUST_USE_INDEX: Self = Self(0x0000_0020);
    pub const IS_INTERLEAVED: Self = Self(0x0000_0100);
    pub const WAS_CAPTURE_FILE: Self = Self(0x0001_0000);
    pub const COPYRIGHTED: Self = Self(0x0002_0000);

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Names of the set flags, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        [
            (Self::HAS_INDEX, "HASINDEX"),
            (Self::MUST_USE_INDEX, "MUSTUSEINDEX"),
            (Self::IS_INTERLEAVED, "ISINTERLEAVED"),
            (Self::WAS_CAPTURE_FILE, "WASCAPTUREFILE"),
            (Self::COPYRIGHTED, "COPYRIGHTED"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect()
    }
}

// ── Main header ───────────────────────────────────────────────────────

/// The `"avih"` chunk.
///
/// ```text
/// ┌────────┬─────────────────────────┐
/// │ Offset │ Field (all u32 LE)      │
/// ├────────┼─────────────────────────┤
/// │ 0      │ microseconds per frame  │
/// │ 4      │ max bytes per second    │
/// │ 8      │ padding granularity     │
/// │ 12     │ flags                   │
/// │ 16     │ total frames            │
/// │ 20     │ initial frames          │
/// │ 24     │ streams                 │
/// │ 28     │ suggested buffer size   │
/// │ 32     │ width                   │
/// │ 36     │ height                  │
/// │ 40     │ reserved [4]            │
/// └────────┴─────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AviMainHeader {
    pub micro_sec_per_frame: u32,
    pub max_bytes_per_sec: u32,
    pub padding_granularity: u32,
    pub flags: AviFlags,
    pub total_frames: u32,
    pub initial_frames: u32,
    pub streams: u32,
    pub suggested_buffer_size: u32,
    pub width: u32,
    pub height: u32,
    pub reserved: [u32; 4],
}

impl AviMainHeader {
    pub const BODY_LEN: usize = 56;
    pub const LEN: usize = ChunkHeader::LEN + Self::BODY_LEN;

    /// Playing time of the whole file.
    pub fn total_duration(&self) -> Duration {
        Duration::from_micros(u64::from(self.micro_sec_per_frame) * u64::from(self.total_frames))
    }

    /// Frames per second, if the frame duration is known.
    pub fn frame_rate(&self) -> Option<f64> {
        (self.micro_sec_per_frame != 0).then(|| 1_000_000.0 / f64::from(self.micro_sec_per_frame))
    }

    /// Decode from a chunk already split off by a walk.
    fn from_chunk(header: ChunkHeader, body: &[u8]) -> Result<Self, FormatError> {
        if header.tag != FourCc::AVIH {
            return Err(FormatError::malformed(
                FORMAT,
                format!("expected 'avih' chunk, found '{}'", header.tag),
            ));
        }
        if header.body_len() != Self::BODY_LEN {
            return Err(FormatError::malformed(
                FORMAT,
                format!("'avih' size {}, expected {}", header.size, Self::BODY_LEN),
            ));
        }
        let field = |i: usize| read_u32_le(body, i * 4);
        Ok(Self {
            micro_sec_per_frame: field(0)?,
            max_bytes_per_sec: field(1)?,
            padding_granularity: field(2)?,
            flags: AviFlags::from_raw(field(3)?),
            total_frames: field(4)?,
            initial_frames: field(5)?,
            streams: field(6)?,
            suggested_buffer_size: field(7)?,
            width: field(8)?,
            height: field(9)?,
            reserved: [field(10)?, field(11)?, field(12)?, field(13)?],
        })
    }
}

impl HeaderCodec for AviMainHeader {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        if let Some(pos) = buf.iter().zip(FourCc::AVIH.as_bytes()).position(|(a, b)| a != b) {
            return ParseStatus::Invalid(FormatError::malformed(
                FORMAT,
                format!("expected 'avih' tag, byte {pos} is {:#04X}", buf[pos]),
            ));
        }
        if buf.len() < Self::LEN {
            return ParseStatus::NeedMore(Self::LEN - buf.len());
        }
        let header = ChunkHeader {
            tag: FourCc::AVIH,
            size: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        };
        Self::from_chunk(header, &buf[ChunkHeader::LEN..Self::LEN])
            .map(|value| (value, Self::LEN))
            .into()
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        ChunkHeader::new(FourCc::AVIH, size_field(Self::BODY_LEN)?).write_to(out)?;
        for value in [
            self.micro_sec_per_frame,
            self.max_bytes_per_sec,
            self.padding_granularity,
            self.flags.raw(),
            self.total_frames,
            self.initial_frames,
            self.streams,
            self.suggested_buffer_size,
            self.width,
            self.height,
        ]
        .into_iter()
        .chain(self.reserved)
        {
            out.extend_from_slice(&value.to_le_bytes());
        }
        Ok(Self::LEN)
    }
}

// ── Stream header list ────────────────────────────────────────────────

/// One `LIST 'strl'`: the chunks describing a single stream, in order.
///
/// The first chunk is always `'strh'`. Bodies are not decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamHeaderList {
    pub chunks: Vec<RawChunk>,
}

impl StreamHeaderList {
    /// # Errors
    ///
    /// `MalformedHeader` if `chunks` is empty or does not start with `'strh'`.
    pub fn new(chunks: Vec<RawChunk>) -> Result<Self, FormatError> {
        check_starts_with_strh(chunks.first().map(|c| c.tag))?;
        Ok(Self { chunks })
    }

    /// The `'strh'` chunk.
    pub fn stream_header(&self) -> Option<&RawChunk> {
        self.chunks.first()
    }

    /// The `'strf'` chunk, if present.
    pub fn stream_format(&self) -> Option<&RawChunk> {
        self.chunks.iter().find(|c| c.tag == FourCc::STRF)
    }

    fn content_len(&self) -> usize {
        self.chunks.iter().map(RawChunk::total_len).sum()
    }

    pub fn total_len(&self) -> usize {
        ListHeader::LEN + self.content_len()
    }

    /// Decode the nested chunks of a `strl` list.
    ///
    /// `content` starts after the list type; `base` is its offset within the
    /// enclosing walk, used for error context.
    fn from_content(content: &[u8], base: usize) -> Result<Self, FormatError> {
        let mut chunks = Vec::new();
        for chunk in ChunkIter::with_base(content, base) {
            chunks.push(chunk?.to_raw());
        }
        check_starts_with_strh(chunks.first().map(|c| c.tag))?;
        Ok(Self { chunks })
    }
}

fn check_starts_with_strh(first: Option<FourCc>) -> Result<(), FormatError> {
    match first {
        Some(FourCc::STRH) => Ok(()),
        Some(tag) => Err(FormatError::malformed(
            FORMAT,
            format!("'strl' list starts with '{tag}', expected 'strh'"),
        )),
        None => Err(FormatError::malformed(FORMAT, "empty 'strl' list")),
    }
}

impl HeaderCodec for StreamHeaderList {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        let list = match ListHeader::parse(buf) {
            ParseStatus::Complete { value, .. } => value,
            ParseStatus::NeedMore(n) => return ParseStatus::NeedMore(n),
            ParseStatus::Invalid(e) => return ParseStatus::Invalid(e),
        };
        if list.list_type != FourCc::STRL {
            return ParseStatus::Invalid(FormatError::malformed(
                FORMAT,
                format!("expected 'strl' list, found '{}'", list.list_type),
            ));
        }
        let end = ChunkHeader::LEN + list.size as usize;
        if buf.len() < end {
            return ParseStatus::NeedMore(end - buf.len());
        }
        Self::from_content(&buf[ListHeader::LEN..end], ListHeader::LEN)
            .map(|value| (value, end))
            .into()
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        ListHeader::for_content(FourCc::STRL, self.content_len())?.write_to(out)?;
        for chunk in &self.chunks {
            chunk.write_to(out)?;
        }
        Ok(self.total_len())
    }
}

// ── Header list ───────────────────────────────────────────────────────

/// An entry of the `hdrl` list after the main header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HdrlEntry {
    Stream(StreamHeaderList),
    /// `JUNK`, `LIST 'odml'` and anything else, kept as-is.
    Other(RawChunk),
}

impl HdrlEntry {
    fn total_len(&self) -> usize {
        match self {
            Self::Stream(s) => s.total_len(),
            Self::Other(c) => c.total_len(),
        }
    }
}

/// A decoded `LIST 'hdrl'`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AviHeaderList {
    pub main: AviMainHeader,
    /// Everything after `'avih'`, in file order.
    pub entries: Vec<HdrlEntry>,
}

impl AviHeaderList {
    pub fn new(main: AviMainHeader) -> Self {
        Self {
            main,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_stream(mut self, stream: StreamHeaderList) -> Self {
        self.entries.push(HdrlEntry::Stream(stream));
        self
    }

    #[must_use]
    pub fn with_chunk(mut self, chunk: RawChunk) -> Self {
        self.entries.push(HdrlEntry::Other(chunk));
        self
    }

    pub fn streams(&self) -> impl Iterator<Item = &StreamHeaderList> {
        self.entries.iter().filter_map(|e| match e {
            HdrlEntry::Stream(s) => Some(s),
            HdrlEntry::Other(_) => None,
        })
    }

    fn content_len(&self) -> usize {
        AviMainHeader::LEN + self.entries.iter().map(HdrlEntry::total_len).sum::<usize>()
    }

    /// Decode a `hdrl` list that must lie entirely inside `region`.
    ///
    /// Unlike [`parse`](HeaderCodec::parse), running out of bytes is not a
    /// reason to wait: the region is all there is, so an outer or nested
    /// size that overruns it is `TruncatedContainer`.
    ///
    /// # Errors
    ///
    /// - `InsufficientData` if `region` cannot hold the 12-byte list header.
    /// - `TruncatedContainer` if any declared size overruns its container.
    /// - `MalformedHeader` for a wrong list type or a bad nested layout.
    pub fn parse_region(region: &[u8]) -> Result<(Self, usize), FormatError> {
        let (list, _) = ListHeader::parse(region).into_result()?;
        check_hdrl(list)?;
        list
            .chunk_header()
            .check_fits(0, region.len() - ChunkHeader::LEN)?;
        let end = ChunkHeader::LEN + list.size as usize;
        let value = Self::from_content(&region[ListHeader::LEN..end])?;
        Ok((value, end))
    }

    /// Walk the nested chunks of an `hdrl` list, `content` starting after
    /// the list type.
    fn from_content(content: &[u8]) -> Result<Self, FormatError> {
        let mut walk = ChunkIter::with_base(content, ListHeader::LEN);

        let first = match walk.next() {
            Some(chunk) => chunk.map_err(|e| e.at(ListHeader::LEN, "hdrl chunk"))?,
            None => return Err(FormatError::malformed(FORMAT, "empty 'hdrl' list")),
        };
        let main = AviMainHeader::from_chunk(first.header, first.body)
            .map_err(|e| e.at(first.offset, "avih chunk"))?;
        debug!(
            streams = main.streams,
            total_frames = main.total_frames,
            "avi main header"
        );

        let mut entries = Vec::new();
        loop {
            let offset = walk.offset();
            let Some(chunk) = walk.next() else { break };
            let chunk = chunk.map_err(|e| e.at(offset, "hdrl chunk"))?;
            entries.push(Self::entry(&chunk)?);
        }

        let value = Self { main, entries };
        let found = value.streams().count();
        if found != main.streams as usize {
            warn!(
                declared = main.streams,
                found, "avi main header stream count disagrees with strl lists"
            );
        }
        Ok(value)
    }

    fn entry(chunk: &ChunkRef<'_>) -> Result<HdrlEntry, FormatError> {
        if chunk.list_type() == Some(FourCc::STRL) {
            let content_base = chunk.offset + ListHeader::LEN;
            let stream = StreamHeaderList::from_content(&chunk.body[4..], content_base)
                .map_err(|e| e.at(chunk.offset, "strl list"))?;
            debug!(offset = chunk.offset, chunks = stream.chunks.len(), "strl list");
            return Ok(HdrlEntry::Stream(stream));
        }
        debug!(offset = chunk.offset, tag = %chunk.header.tag, "opaque hdrl chunk");
        Ok(HdrlEntry::Other(chunk.to_raw()))
    }

    /// Locate and decode the `hdrl` list of a whole AVI file.
    ///
    /// A RIFF size larger than the file is tolerated (truncated captures are
    /// common); the walk is bounded by whichever is smaller.
    ///
    /// # Errors
    ///
    /// `MalformedHeader` if the file is not `RIFF 'AVI '` or has no `hdrl`
    /// list, otherwise whatever [`parse_region`](Self::parse_region) reports.
    pub fn find_in_file(file: &[u8]) -> Result<Self, FormatError> {
        let (riff, _) = RiffFormHeader::parse(file).into_result()?;
        if riff.form_type != FourCc::AVI {
            return Err(FormatError::malformed(
                FORMAT,
                format!("RIFF form '{}', expected 'AVI '", riff.form_type),
            ));
        }
        let end = (ChunkHeader::LEN + riff.size as usize).min(file.len());
        let top = &file[RiffFormHeader::LEN..end];

        // Only the header of each top-level chunk is needed to find hdrl, so
        // step manually instead of requiring every chunk (movi) to be whole.
        let mut pos = 0;
        while pos + ListHeader::LEN <= top.len() {
            let (header, _) = ChunkHeader::parse(&top[pos..]).into_result()?;
            if header.tag == FourCc::LIST && top[pos + 8..pos + 12] == *FourCc::HDRL.as_bytes() {
                let (value, _) = Self::parse_region(&top[pos..])
                    .map_err(|e| e.at(RiffFormHeader::LEN + pos, "hdrl list"))?;
                return Ok(value);
            }
            pos += header.total_len();
        }
        Err(FormatError::malformed(FORMAT, "no 'hdrl' list in RIFF AVI file"))
    }
}

fn check_hdrl(list: ListHeader) -> Result<(), FormatError> {
    if list.list_type == FourCc::HDRL {
        Ok(())
    } else {
        Err(FormatError::malformed(
            FORMAT,
            format!("expected 'hdrl' list, found '{}'", list.list_type),
        ))
    }
}

impl HeaderCodec for AviHeaderList {
    type Error = FormatError;

    /// Streaming form: waits for the whole outer list, then walks it.
    /// A nested size overrunning the outer list is `TruncatedContainer`.
    fn parse(buf: &[u8]) -> Parse<Self> {
        let list = match ListHeader::parse(buf) {
            ParseStatus::Complete { value, .. } => value,
            ParseStatus::NeedMore(n) => return ParseStatus::NeedMore(n),
            ParseStatus::Invalid(e) => return ParseStatus::Invalid(e),
        };
        if let Err(e) = check_hdrl(list) {
            return ParseStatus::Invalid(e);
        }
        let end = ChunkHeader::LEN + list.size as usize;
        if buf.len() < end {
            return ParseStatus::NeedMore(end - buf.len());
        }
        match Self::from_content(&buf[ListHeader::LEN..end]) {
            Ok(value) => ParseStatus::Complete {
                value,
                consumed: end,
            },
            // Everything the list declared is present, so a shortfall inside it
            // is a layout error rather than a reason to wait.
            Err(e) => ParseStatus::Invalid(e),
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        let content_len = self.content_len();
        ListHeader::for_content(FourCc::HDRL, content_len)?.write_to(out)?;
        self.main.write_to(out)?;
        for entry in &self.entries {
            match entry {
                HdrlEntry::Stream(s) => s.write_to(out)?,
                HdrlEntry::Other(c) => c.write_to(out)?,
            };
        }
        Ok(ListHeader::LEN + content_len)
    }
}
