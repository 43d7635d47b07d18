use std::fmt;

use crate::gzip::{ID1, ID2};
use crate::mpeg::MpegAudioHeader;
use crate::riff::FourCc;
use crate::{id3, pdf};

/// The formats [`sniff`] can recognise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Gzip,
    Riff,
    Id3v2,
    MpegAudio,
    Pdf,
}

impl Format {
    pub const ALL: [Self; 5] = [Self::Gzip, Self::Riff, Self::Id3v2, Self::MpegAudio, Self::Pdf];

    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Riff => "riff",
            Self::Id3v2 => "id3v2",
            Self::MpegAudio => "mpeg audio",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identify a format by the magic at the start of `buf`.
///
/// An ID3v2 tag is reported as [`Format::Id3v2`] even though MPEG audio
/// usually follows it. MPEG audio without a tag needs a whole valid
/// 4-byte header; a bare sync pattern is not enough.
pub fn sniff(buf: &[u8]) -> Option<Format> {
    if buf.starts_with(&[ID1, ID2]) {
        Some(Format::Gzip)
    } else if buf.starts_with(FourCc::RIFF.as_bytes()) {
        Some(Format::Riff)
    } else if buf.starts_with(id3::MAGIC) {
        Some(Format::Id3v2)
    } else if buf.starts_with(pdf::MAGIC) {
        Some(Format::Pdf)
    } else if MpegAudioHeader::is_header_at(buf) {
        Some(Format::MpegAudio)
    } else {
        None
    }
}
