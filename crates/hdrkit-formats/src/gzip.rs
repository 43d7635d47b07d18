//! GZIP member header and trailer (RFC 1952).
//!
//! ```text
//! ┌──────┬──────┬──────┬──────┬─────────────┬──────┬──────┐
//! │ ID1  │ ID2  │ CM   │ FLG  │ MTIME (LE)  │ XFL  │ OS   │  10 bytes
//! │ 0x1F │ 0x8B │ 0x08 │      │ 4 bytes     │      │      │
//! └──────┴──────┴──────┴──────┴─────────────┴──────┴──────┘
//!   FEXTRA   → XLEN (u16 LE) + XLEN bytes
//!   FNAME    → ISO-8859-1 string, NUL-terminated
//!   FCOMMENT → ISO-8859-1 string, NUL-terminated
//!   FHCRC    → u16 LE, low half of CRC-32 over every byte before it
//! ```
//!
//! The trailer is a flat 8 bytes after the compressed data: CRC-32 of the
//! uncompressed payload, then its length mod 2^32, both little-endian.

use std::fmt;

use hdrkit_wire::binary_io::{read_u16_le, read_u32_le};
use hdrkit_wire::crc::crc32;
use hdrkit_wire::{HeaderCodec, ParseStatus, WireError};

use crate::Parse;
use crate::config::GzipLimits;
use crate::error::FormatError;

pub const ID1: u8 = 0x1F;
pub const ID2: u8 = 0x8B;
/// The only compression method RFC 1952 defines.
pub const CM_DEFLATE: u8 = 8;
pub const FIXED_LEN: usize = 10;
pub const TRAILER_LEN: usize = 8;
pub const MAX_EXTRA_LEN: usize = u16::MAX as usize;

const FORMAT: &str = "gzip";

// ── Flags ─────────────────────────────────────────────────────────────

/// The FLG byte.
///
/// Bit layout:
///   bit 0 = FTEXT, payload is probably ASCII text
///   bit 1 = FHCRC, header CRC-16 present
///   bit 2 = FEXTRA, extra field present
///   bit 3 = FNAME, original file name present
///   bit 4 = FCOMMENT, comment present
///   bits 5-7 = reserved, must be zero
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GzipFlags(u8);

impl GzipFlags {
    pub const NONE: Self = Self(0);
    pub const FTEXT: Self = Self(0b0000_0001);
    pub const FHCRC: Self = Self(0b0000_0010);
    pub const FEXTRA: Self = Self(0b0000_0100);
    pub const FNAME: Self = Self(0b0000_1000);
    pub const FCOMMENT: Self = Self(0b0001_0000);
    pub const RESERVED: Self = Self(0b1110_0000);

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
        if on { Self(self.0 | other.0) } else { self }
    }

    pub fn has_reserved(self) -> bool {
        self.0 & Self::RESERVED.0 != 0
    }
}

// ── Operating system ──────────────────────────────────────────────────

/// The OS byte: the file system the member was written on.
///
/// ```text
/// ┌──────┬──────────────┐    ┌──────┬──────────────┐
/// │  0   │ FAT          │    │  8   │ Z-System     │
/// │  1   │ Amiga        │    │  9   │ CP/M         │
/// │  2   │ VMS          │    │ 10   │ TOPS-20      │
/// │  3   │ Unix         │    │ 11   │ NTFS         │
/// │  4   │ VM/CMS       │    │ 12   │ QDOS         │
/// │  5   │ Atari TOS    │    │ 13   │ Acorn RISCOS │
/// │  6   │ HPFS         │    │ 255  │ unknown      │
/// │  7   │ Macintosh    │    │      │              │
/// └──────┴──────────────┘    └──────┴──────────────┘
/// ```
///
/// Values RFC 1952 leaves unassigned are kept as `Other` so they survive
/// a re-encode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OperatingSystem {
    Fat,
    Amiga,
    Vms,
    Unix,
    VmCms,
    AtariTos,
    Hpfs,
    Macintosh,
    ZSystem,
    CpM,
    Tops20,
    Ntfs,
    Qdos,
    AcornRiscos,
    #[default]
    Unknown,
    Other(u8),
}

impl OperatingSystem {
    pub fn from_byte(value: u8) -> Self {
        match value {
            0 => Self::Fat,
            1 => Self::Amiga,
            2 => Self::Vms,
            3 => Self::Unix,
            4 => Self::VmCms,
            5 => Self::AtariTos,
            6 => Self::Hpfs,
            7 => Self::Macintosh,
            8 => Self::ZSystem,
            9 => Self::CpM,
            10 => Self::Tops20,
            11 => Self::Ntfs,
            12 => Self::Qdos,
            13 => Self::AcornRiscos,
            255 => Self::Unknown,
            other => Self::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Fat => 0,
            Self::Amiga => 1,
            Self::Vms => 2,
            Self::Unix => 3,
            Self::VmCms => 4,
            Self::AtariTos => 5,
            Self::Hpfs => 6,
            Self::Macintosh => 7,
            Self::ZSystem => 8,
            Self::CpM => 9,
            Self::Tops20 => 10,
            Self::Ntfs => 11,
            Self::Qdos => 12,
            Self::AcornRiscos => 13,
            Self::Unknown => 255,
            Self::Other(b) => b,
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fat => "FAT",
            Self::Amiga => "Amiga",
            Self::Vms => "VMS",
            Self::Unix => "Unix",
            Self::VmCms => "VM/CMS",
            Self::AtariTos => "Atari TOS",
            Self::Hpfs => "HPFS",
            Self::Macintosh => "Macintosh",
            Self::ZSystem => "Z-System",
            Self::CpM => "CP/M",
            Self::Tops20 => "TOPS-20",
            Self::Ntfs => "NTFS",
            Self::Qdos => "QDOS",
            Self::AcornRiscos => "Acorn RISCOS",
            Self::Unknown => "unknown",
            Self::Other(b) => return write!(f, "OS {b}"),
        };
        f.write_str(name)
    }
}

// ── Header ────────────────────────────────────────────────────────────

/// A decoded GZIP member header.
///
/// The FLG byte is not stored: it is derived from which optional fields
/// are present, so a header can never claim a field it does not carry.
/// String fields hold raw ISO-8859-1 bytes without the terminator; use
/// [`latin1`] to turn them into text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GzipHeader {
    pub text: bool,
    /// Modification time, seconds since the Unix epoch. 0 = not available.
    pub mtime: u32,
    pub xfl: u8,
    pub os: OperatingSystem,
    pub extra: Option<Vec<u8>>,
    pub filename: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
    /// Emit (and on parse, verified) an FHCRC field.
    pub header_crc: bool,
}

/// Optional trailing fields in wire order, for shortfall accounting.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Field {
    Extra,
    Name,
    Comment,
    Crc,
}

impl GzipHeader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }

    #[must_use]
    pub fn with_os(mut self, os: OperatingSystem) -> Self {
        self.os = os;
        self
    }

    #[must_use]
    pub fn with_xfl(mut self, xfl: u8) -> Self {
        self.xfl = xfl;
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    #[must_use]
    pub fn with_header_crc(mut self, on: bool) -> Self {
        self.header_crc = on;
        self
    }

    /// # Errors
    ///
    /// `MalformedHeader` if `name` contains a NUL byte.
    pub fn with_filename(mut self, name: impl Into<Vec<u8>>) -> Result<Self, FormatError> {
        let name = name.into();
        check_no_nul(&name, "filename")?;
        self.filename = Some(name);
        Ok(self)
    }

    /// # Errors
    ///
    /// `MalformedHeader` if `comment` contains a NUL byte.
    pub fn with_comment(mut self, comment: impl Into<Vec<u8>>) -> Result<Self, FormatError> {
        let comment = comment.into();
        check_no_nul(&comment, "comment")?;
        self.comment = Some(comment);
        Ok(self)
    }

    /// # Errors
    ///
    /// `ValueOutOfRange` if `extra` is longer than 65535 bytes.
    pub fn with_extra(mut self, extra: impl Into<Vec<u8>>) -> Result<Self, FormatError> {
        let extra = extra.into();
        check_extra_len(&extra)?;
        self.extra = Some(extra);
        Ok(self)
    }

    pub fn flags(&self) -> GzipFlags {
        GzipFlags::NONE
            .with(GzipFlags::FTEXT, self.text)
            .with(GzipFlags::FHCRC, self.header_crc)
            .with(GzipFlags::FEXTRA, self.extra.is_some())
            .with(GzipFlags::FNAME, self.filename.is_some())
            .with(GzipFlags::FCOMMENT, self.comment.is_some())
    }

    /// Iterate the `SI1 SI2 LEN data` subfields of the extra field.
    pub fn subfields(&self) -> ExtraSubfields<'_> {
        ExtraSubfields {
            rest: self.extra.as_deref().unwrap_or_default(),
            offset: 0,
        }
    }

    /// Parse with explicit limits instead of [`GzipLimits::default`].
    pub fn parse_with(buf: &[u8], limits: &GzipLimits) -> Parse<Self> {
        // Reject what can already be rejected, however short the buffer.
        for (i, (&actual, expected)) in buf.iter().zip([ID1, ID2]).enumerate() {
            if actual != expected {
                return ParseStatus::Invalid(FormatError::malformed(
                    FORMAT,
                    format!("magic byte {i} is {actual:#04X}, expected {expected:#04X}"),
                ));
            }
        }
        if let Some(&cm) = buf.get(2) {
            if cm != CM_DEFLATE {
                return ParseStatus::Invalid(FormatError::malformed(
                    FORMAT,
                    format!("compression method {cm}, expected {CM_DEFLATE} (deflate)"),
                ));
            }
        }
        let flags = match buf.get(3) {
            Some(&raw) => GzipFlags::from_raw(raw),
            None => return ParseStatus::NeedMore(FIXED_LEN - buf.len()),
        };
        if flags.has_reserved() {
            return ParseStatus::Invalid(FormatError::malformed(
                FORMAT,
                format!("reserved flag bits set in {:#04X}", flags.raw()),
            ));
        }

        let tail = |from: Field| tail_min(flags, from);
        if buf.len() < FIXED_LEN {
            return ParseStatus::NeedMore(FIXED_LEN - buf.len() + tail(Field::Extra));
        }

        let mut header = GzipHeader {
            text: flags.contains(GzipFlags::FTEXT),
            mtime: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            xfl: buf[8],
            os: OperatingSystem::from_byte(buf[9]),
            header_crc: flags.contains(GzipFlags::FHCRC),
            ..GzipHeader::default()
        };
        let mut pos = FIXED_LEN;

        if flags.contains(GzipFlags::FEXTRA) {
            let xlen = match read_u16_le(buf, pos) {
                Ok(v) => usize::from(v),
                Err(_) => return ParseStatus::NeedMore(pos + 2 - buf.len() + tail(Field::Name)),
            };
            let end = pos + 2 + xlen;
            if buf.len() < end {
                return ParseStatus::NeedMore(end - buf.len() + tail(Field::Name));
            }
            header.extra = Some(buf[pos + 2..end].to_vec());
            pos = end;
        }

        let string_fields = [
            (Field::Name, GzipFlags::FNAME),
            (Field::Comment, GzipFlags::FCOMMENT),
        ];
        for (field, flag) in string_fields {
            if !flags.contains(flag) {
                continue;
            }
            let rest = &buf[pos..];
            let Some(nul) = rest.iter().position(|&b| b == 0) else {
                if rest.len() > limits.max_field_len {
                    return ParseStatus::Invalid(FormatError::malformed(
                        FORMAT,
                        format!(
                            "unterminated string field longer than {} bytes",
                            limits.max_field_len
                        ),
                    ));
                }
                // The terminator, plus whatever follows.
                return ParseStatus::NeedMore(tail(field));
            };
            if nul > limits.max_field_len {
                return ParseStatus::Invalid(FormatError::malformed(
                    FORMAT,
                    format!("string field of {nul} bytes exceeds {}", limits.max_field_len),
                ));
            }
            let value = rest[..nul].to_vec();
            match field {
                Field::Name => header.filename = Some(value),
                _ => header.comment = Some(value),
            }
            pos += nul + 1;
        }

        if header.header_crc {
            let stored = match read_u16_le(buf, pos) {
                Ok(v) => v,
                Err(_) => return ParseStatus::NeedMore(pos + 2 - buf.len()),
            };
            let computed = header_crc16(&buf[..pos]);
            if stored != computed {
                return ParseStatus::Invalid(FormatError::ChecksumMismatch {
                    format: FORMAT,
                    stored: u32::from(stored),
                    computed: u32::from(computed),
                });
            }
            pos += 2;
        }

        ParseStatus::Complete {
            value: header,
            consumed: pos,
        }
    }

    /// Total encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        FIXED_LEN
            + self.extra.as_ref().map_or(0, |e| 2 + e.len())
            + self.filename.as_ref().map_or(0, |n| n.len() + 1)
            + self.comment.as_ref().map_or(0, |c| c.len() + 1)
            + if self.header_crc { 2 } else { 0 }
    }
}

/// Minimum bytes still owed by the optional fields from `from` onwards.
///
/// A string field owes at least its terminator.
fn tail_min(flags: GzipFlags, from: Field) -> usize {
    [
        (Field::Extra, GzipFlags::FEXTRA, 2),
        (Field::Name, GzipFlags::FNAME, 1),
        (Field::Comment, GzipFlags::FCOMMENT, 1),
        (Field::Crc, GzipFlags::FHCRC, 2),
    ]
    .into_iter()
    .filter(|&(field, flag, _)| field >= from && flags.contains(flag))
    .map(|(_, _, min)| min)
    .sum()
}

/// Low 16 bits of the CRC-32 of `header_bytes`.
pub fn header_crc16(header_bytes: &[u8]) -> u16 {
    #[allow(clippy::cast_possible_truncation)]
    let low = crc32(header_bytes) as u16;
    low
}

fn check_no_nul(value: &[u8], field: &str) -> Result<(), FormatError> {
    if value.contains(&0) {
        return Err(FormatError::malformed(
            FORMAT,
            format!("{field} contains a NUL byte"),
        ));
    }
    Ok(())
}

fn check_extra_len(extra: &[u8]) -> Result<(), FormatError> {
    if extra.len() > MAX_EXTRA_LEN {
        return Err(
            WireError::ValueOutOfRange {
                what: "gzip extra field length",
                value: extra.len() as u64,
                max: MAX_EXTRA_LEN as u64,
            }
            .into(),
        );
    }
    Ok(())
}

/// Decode ISO-8859-1 bytes. Every byte maps to the code point of the
/// same value, so this never fails.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

impl HeaderCodec for GzipHeader {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        Self::parse_with(buf, &GzipLimits::default())
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        if let Some(extra) = &self.extra {
            check_extra_len(extra)?;
        }
        if let Some(name) = &self.filename {
            check_no_nul(name, "filename")?;
        }
        if let Some(comment) = &self.comment {
            check_no_nul(comment, "comment")?;
        }

        let start = out.len();
        out.extend_from_slice(&[ID1, ID2, CM_DEFLATE, self.flags().raw()]);
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.push(self.xfl);
        out.push(self.os.to_byte());
        if let Some(extra) = &self.extra {
            #[allow(clippy::cast_possible_truncation)]
            let xlen = extra.len() as u16;
            out.extend_from_slice(&xlen.to_le_bytes());
            out.extend_from_slice(extra);
        }
        for field in [&self.filename, &self.comment].into_iter().flatten() {
            out.extend_from_slice(field);
            out.push(0);
        }
        if self.header_crc {
            let crc = header_crc16(&out[start..]);
            out.extend_from_slice(&crc.to_le_bytes());
        }
        Ok(out.len() - start)
    }
}

// ── Extra subfields ───────────────────────────────────────────────────

/// One `SI1 SI2 LEN data` entry of the FEXTRA field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtraSubfield<'a> {
    pub id: [u8; 2],
    pub data: &'a [u8],
}

/// Iterator over [`ExtraSubfield`]s. Yields one error and stops if a
/// subfield overruns the extra field.
#[derive(Clone, Debug)]
pub struct ExtraSubfields<'a> {
    rest: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for ExtraSubfields<'a> {
    type Item = Result<ExtraSubfield<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.rest);
        if rest.len() < 4 {
            return Some(Err(FormatError::malformed(
                FORMAT,
                format!("extra subfield header at offset {} truncated", self.offset),
            )));
        }
        let len = usize::from(u16::from_le_bytes([rest[2], rest[3]]));
        let Some(data) = rest.get(4..4 + len) else {
            return Some(Err(FormatError::malformed(
                FORMAT,
                format!(
                    "extra subfield at offset {} declares {len} bytes, {} left",
                    self.offset,
                    rest.len() - 4
                ),
            )));
        };
        self.rest = &rest[4 + len..];
        self.offset += 4 + len;
        Some(Ok(ExtraSubfield {
            id: [rest[0], rest[1]],
            data,
        }))
    }
}

/// Build an extra field from `(id, data)` subfields.
///
/// # Errors
///
/// `ValueOutOfRange` if one subfield's data or the whole field does not
/// fit a `u16` length.
pub fn encode_subfields<'a>(
    subfields: impl IntoIterator<Item = ([u8; 2], &'a [u8])>,
) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::new();
    for (id, data) in subfields {
        let len = u16::try_from(data.len()).map_err(|_| WireError::ValueOutOfRange {
            what: "gzip extra subfield length",
            value: data.len() as u64,
            max: u64::from(u16::MAX),
        })?;
        out.extend_from_slice(&id);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(data);
    }
    check_extra_len(&out)?;
    Ok(out)
}

// ── Trailer ───────────────────────────────────────────────────────────

/// The 8-byte member trailer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GzipTrailer {
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Uncompressed size mod 2^32.
    pub isize: u32,
}

impl GzipTrailer {
    /// The trailer a member holding `payload` (uncompressed) must carry.
    pub fn for_payload(payload: &[u8]) -> Self {
        Self {
            crc32: crc32(payload),
            isize: size_mod_32(payload.len()),
        }
    }

    /// Check this trailer against the uncompressed `payload`.
    ///
    /// # Errors
    ///
    /// `ChecksumMismatch` if the CRC-32 differs, `MalformedHeader` if only
    /// the size differs.
    pub fn verify(&self, payload: &[u8]) -> Result<(), FormatError> {
        let expected = Self::for_payload(payload);
        if self.crc32 != expected.crc32 {
            return Err(FormatError::ChecksumMismatch {
                format: "gzip trailer",
                stored: self.crc32,
                computed: expected.crc32,
            });
        }
        if self.isize != expected.isize {
            return Err(FormatError::malformed(
                FORMAT,
                format!(
                    "ISIZE {} does not match payload size {}",
                    self.isize, expected.isize
                ),
            ));
        }
        Ok(())
    }
}

fn size_mod_32(len: usize) -> u32 {
    #[allow(clippy::cast_possible_truncation)]
    let low = (len as u64 & 0xFFFF_FFFF) as u32;
    low
}

impl HeaderCodec for GzipTrailer {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        if buf.len() < TRAILER_LEN {
            return ParseStatus::NeedMore(TRAILER_LEN - buf.len());
        }
        let result = (|| {
            let trailer = GzipTrailer {
                crc32: read_u32_le(buf, 0)?,
                isize: read_u32_le(buf, 4)?,
            };
            Ok::<_, FormatError>((trailer, TRAILER_LEN))
        })();
        result.into()
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.isize.to_le_bytes());
        Ok(TRAILER_LEN)
    }
}
