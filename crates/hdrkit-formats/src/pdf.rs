//! The `%PDF-<version>` header line.

use std::fmt;

use hdrkit_wire::{HeaderCodec, ParseStatus};

use crate::Parse;
use crate::error::FormatError;

pub const MAGIC: &[u8; 5] = b"%PDF-";
/// `%PDF-1.x` plus one terminator byte.
pub const MIN_LEN: usize = 8;
/// A header line longer than this is not a PDF header.
pub const MAX_LEN: usize = 32;

const FORMAT: &str = "pdf";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    CrLf,
    Lf,
    Cr,
}

impl LineEnding {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::CrLf => b"\r\n",
            Self::Lf => b"\n",
            Self::Cr => b"\r",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdfHeader {
    /// The text after `%PDF-`, such as `1.7`.
    pub version: String,
    pub line_ending: LineEnding,
}

impl PdfHeader {
    /// # Errors
    ///
    /// `MalformedHeader` unless `version` looks like `<digits>.<digits>`.
    pub fn new(version: impl Into<String>) -> Result<Self, FormatError> {
        let version = version.into();
        check_version(version.as_bytes())?;
        Ok(Self {
            version,
            line_ending: LineEnding::CrLf,
        })
    }

    #[must_use]
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Raw header length, terminator included.
    pub fn len(&self) -> usize {
        MAGIC.len() + self.version.len() + self.line_ending.as_bytes().len()
    }

    /// Never true: the magic alone is five bytes.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `(major, minor)`, or `None` if either part overflows.
    pub fn version_number(&self) -> Option<(u32, u32)> {
        let (major, minor) = self.version.split_once('.')?;
        Some((major.parse().ok()?, minor.parse().ok()?))
    }
}

fn check_version(version: &[u8]) -> Result<(), FormatError> {
    let valid = match version.iter().position(|&b| b == b'.') {
        Some(dot) => {
            let (major, minor) = (&version[..dot], &version[dot + 1..]);
            !major.is_empty()
                && !minor.is_empty()
                && major.iter().chain(minor).all(u8::is_ascii_digit)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FormatError::malformed(
            FORMAT,
            format!("version {:?} is not <major>.<minor>", String::from_utf8_lossy(version)),
        ))
    }
}

impl HeaderCodec for PdfHeader {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        if buf.iter().zip(MAGIC).any(|(a, b)| a != b) {
            return ParseStatus::Invalid(FormatError::malformed(FORMAT, "missing %PDF- magic"));
        }
        if buf.len() < MIN_LEN {
            return ParseStatus::NeedMore(MIN_LEN - buf.len());
        }

        let window = &buf[..buf.len().min(MAX_LEN)];
        let Some(end) = window[MAGIC.len()..]
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
            .map(|i| i + MAGIC.len())
        else {
            if buf.len() >= MAX_LEN {
                return ParseStatus::Invalid(FormatError::malformed(
                    FORMAT,
                    format!("no line terminator within {MAX_LEN} bytes"),
                ));
            }
            return ParseStatus::NeedMore(1);
        };

        let (line_ending, consumed) = match (buf[end], buf.get(end + 1)) {
            (b'\n', _) => (LineEnding::Lf, end + 1),
            (_, Some(b'\n')) => (LineEnding::CrLf, end + 2),
            (_, Some(_)) => (LineEnding::Cr, end + 1),
            // A lone trailing CR may still become CRLF.
            (_, None) => return ParseStatus::NeedMore(1),
        };

        let version = &buf[MAGIC.len()..end];
        if let Err(e) = check_version(version) {
            return ParseStatus::Invalid(e);
        }
        ParseStatus::Complete {
            value: Self {
                version: String::from_utf8_lossy(version).into_owned(),
                line_ending,
            },
            consumed,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        check_version(self.version.as_bytes())?;
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(self.version.as_bytes());
        out.extend_from_slice(self.line_ending.as_bytes());
        Ok(self.len())
    }
}

impl fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}
