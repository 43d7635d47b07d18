use hdrkit_wire::binary_io::read_u16_be;
use hdrkit_wire::{HeaderCodec, ParseStatus};

use super::crc;
use super::header::MpegAudioHeader;
use crate::Parse;
use crate::error::FormatError;

const FORMAT: &str = "mpeg audio";

/// One MPEG audio frame: header, optional CRC-16, opaque audio data.
///
/// ```text
/// ┌────────────┬─────────────┬──────────────────────────────────┐
/// │ header (4) │ CRC-16 (0|2)│ audio data                       │
/// └────────────┴─────────────┴──────────────────────────────────┘
///  ◄──────────────────── header.frame_length() ────────────────►
/// ```
///
/// The CRC is stored big-endian. [`parse`](HeaderCodec::parse) keeps it
/// as found; call [`verify_crc`](Self::verify_crc) to check it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MpegAudioFrame {
    pub header: MpegAudioHeader,
    /// Present exactly when `header.is_protected()`.
    pub crc: Option<u16>,
    pub audio: Vec<u8>,
}

impl MpegAudioFrame {
    /// Build a frame, computing the CRC if the header asks for one.
    ///
    /// # Errors
    ///
    /// - `UnsupportedVariant` for a free-format header.
    /// - `MalformedHeader` if `audio` is not exactly
    ///   [`audio_data_len`](MpegAudioHeader::audio_data_len) bytes.
    pub fn new(header: MpegAudioHeader, audio: Vec<u8>) -> Result<Self, FormatError> {
        check_audio_len(&header, audio.len())?;
        let crc = if header.is_protected() {
            Some(crc::compute(&header, &audio)?)
        } else {
            None
        };
        Ok(Self { header, crc, audio })
    }

    /// Total encoded length, header included.
    pub fn len(&self) -> usize {
        MpegAudioHeader::LEN + self.header.crc_len() + self.audio.len()
    }

    /// Never true: a frame always carries its 4-byte header.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The CRC this frame should carry, computed from header and audio.
    ///
    /// # Errors
    ///
    /// `MalformedHeader` if the audio data is shorter than the region the
    /// CRC covers.
    pub fn computed_crc(&self) -> Result<u16, FormatError> {
        crc::compute(&self.header, &self.audio)
    }

    /// Check the stored CRC-16. Unprotected frames always pass.
    ///
    /// # Errors
    ///
    /// `ChecksumMismatch` if the stored value disagrees with the computed
    /// one, or see [`computed_crc`](Self::computed_crc).
    pub fn verify_crc(&self) -> Result<(), FormatError> {
        let Some(stored) = self.crc else {
            return Ok(());
        };
        let computed = self.computed_crc()?;
        if stored != computed {
            return Err(FormatError::ChecksumMismatch {
                format: FORMAT,
                stored: u32::from(stored),
                computed: u32::from(computed),
            });
        }
        Ok(())
    }

    /// Replace the stored CRC with a freshly computed one, for frames whose
    /// audio data was edited in place.
    ///
    /// # Errors
    ///
    /// See [`computed_crc`](Self::computed_crc).
    pub fn with_recomputed_crc(mut self) -> Result<Self, FormatError> {
        self.crc = if self.header.is_protected() {
            Some(self.computed_crc()?)
        } else {
            None
        };
        Ok(self)
    }
}

fn frame_length(header: &MpegAudioHeader) -> Result<usize, FormatError> {
    header.frame_length().ok_or(FormatError::UnsupportedVariant {
        field: "bitrate",
        value: 0,
    })
}

fn check_audio_len(header: &MpegAudioHeader, actual: usize) -> Result<(), FormatError> {
    let expected = frame_length(header)?
        .checked_sub(MpegAudioHeader::LEN + header.crc_len())
        .ok_or_else(|| FormatError::malformed(FORMAT, "frame shorter than its header"))?;
    if actual != expected {
        return Err(FormatError::malformed(
            FORMAT,
            format!("audio data is {actual} byte(s), header implies {expected}"),
        ));
    }
    Ok(())
}

impl HeaderCodec for MpegAudioFrame {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        let header = match MpegAudioHeader::parse(buf) {
            ParseStatus::Complete { value, .. } => value,
            ParseStatus::NeedMore(n) => return ParseStatus::NeedMore(n),
            ParseStatus::Invalid(e) => return ParseStatus::Invalid(e),
        };
        let frame_len = match frame_length(&header) {
            Ok(len) => len,
            Err(e) => return ParseStatus::Invalid(e),
        };
        let audio_start = MpegAudioHeader::LEN + header.crc_len();
        if frame_len < audio_start {
            return ParseStatus::Invalid(FormatError::malformed(
                FORMAT,
                "frame shorter than its header",
            ));
        }
        if buf.len() < frame_len {
            return ParseStatus::NeedMore(frame_len - buf.len());
        }

        let crc = if header.is_protected() {
            match read_u16_be(buf, MpegAudioHeader::LEN) {
                Ok(crc) => Some(crc),
                Err(e) => return ParseStatus::Invalid(e.into()),
            }
        } else {
            None
        };
        ParseStatus::Complete {
            value: Self {
                header,
                crc,
                audio: buf[audio_start..frame_len].to_vec(),
            },
            consumed: frame_len,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        check_audio_len(&self.header, self.audio.len())?;
        let start = out.len();
        self.header.write_to(out)?;
        match (self.header.is_protected(), self.crc) {
            (true, Some(crc)) => out.extend_from_slice(&crc.to_be_bytes()),
            (false, None) => {}
            (true, None) => {
                out.truncate(start);
                return Err(FormatError::malformed(FORMAT, "protected frame without a CRC"));
            }
            (false, Some(_)) => {
                out.truncate(start);
                return Err(FormatError::malformed(FORMAT, "CRC on an unprotected frame"));
            }
        }
        out.extend_from_slice(&self.audio);
        Ok(out.len() - start)
    }
}
