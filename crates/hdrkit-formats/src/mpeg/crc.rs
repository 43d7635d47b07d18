//! CRC-16 protection of MPEG audio frames (ISO/IEC 11172-3 §2.4.3.1).
//!
//! The checksum covers the last two header bytes, then a layer-dependent
//! number of bits from the start of the audio data (the CRC field itself
//! sits in between and is skipped):
//!
//! ```text
//! Layer I    bit allocation: 4 · (channels · bound + (32 − bound)) bits
//! Layer II   bit allocation + 2 SCFSI bits per allocated subband/channel
//! Layer III  the whole side information
//! ```

use hdrkit_wire::{BitReader, Crc16, WireError};

use super::enums::{ChannelMode, MpegLayer};
use super::header::MpegAudioHeader;
use super::tables;
use crate::error::FormatError;

/// Subbands in Layers I and II.
const SUBBANDS: usize = 32;

/// First intensity-stereo subband for Layers I and II, capped at `limit`.
fn bound(header: &MpegAudioHeader, limit: usize) -> usize {
    if header.channel_mode() == ChannelMode::JointStereo {
        ((usize::from(header.mode_extension()) + 1) * 4).min(limit)
    } else {
        limit
    }
}

/// Number of audio-data bits the CRC covers.
///
/// Layer II has to read the allocation fields themselves, because the
/// SCFSI bits only exist for subbands with a non-zero allocation.
///
/// # Errors
///
/// `MalformedHeader` if `audio` ends inside the Layer II allocation.
pub fn protected_bits(header: &MpegAudioHeader, audio: &[u8]) -> Result<usize, FormatError> {
    let channels = usize::from(header.channels());
    match header.layer() {
        MpegLayer::I => {
            let bound = bound(header, SUBBANDS);
            Ok(4 * (channels * bound + (SUBBANDS - bound)))
        }
        MpegLayer::II => layer2_bits(header, audio).map_err(|e| match e {
            WireError::InsufficientData { .. } => FormatError::malformed(
                "mpeg audio",
                format!(
                    "{} byte(s) of audio data end inside the layer II allocation",
                    audio.len()
                ),
            ),
            other => other.into(),
        }),
        MpegLayer::III => Ok(header.side_info_len() * 8),
        MpegLayer::Reserved => Err(FormatError::malformed("mpeg audio", "reserved layer")),
    }
}

fn layer2_bits(header: &MpegAudioHeader, audio: &[u8]) -> Result<usize, WireError> {
    let channels = usize::from(header.channels());
    let table = tables::layer2_allocation(
        header.version(),
        header.bitrate_kbps(),
        header.channels(),
        header.sampling_rate(),
    );
    let sblimit = table.sblimit();
    let bound = bound(header, sblimit);

    let mut reader = BitReader::new(audio);
    let mut allocated = [[false; SUBBANDS]; 2];
    for sb in 0..sblimit {
        let nbal = u32::from(table.nbal(sb));
        if sb < bound {
            for ch_alloc in allocated.iter_mut().take(channels) {
                ch_alloc[sb] = reader.read_bits(nbal)? != 0;
            }
        } else {
            // Intensity stereo: one allocation shared by both channels.
            let shared = reader.read_bits(nbal)? != 0;
            for ch_alloc in allocated.iter_mut().take(channels) {
                ch_alloc[sb] = shared;
            }
        }
    }

    let scfsi_bits: usize = allocated
        .iter()
        .take(channels)
        .map(|ch| ch[..sblimit].iter().filter(|&&a| a).count() * 2)
        .sum();
    Ok(reader.position() + scfsi_bits)
}

/// Compute the CRC-16 of a frame from its header and audio data.
///
/// # Errors
///
/// `MalformedHeader` if `audio` is shorter than the protected region.
pub fn compute(header: &MpegAudioHeader, audio: &[u8]) -> Result<u16, FormatError> {
    let bits = protected_bits(header, audio)?;
    if bits > audio.len() * 8 {
        return Err(FormatError::malformed(
            "mpeg audio",
            format!(
                "CRC covers {bits} bits but audio data holds {}",
                audio.len() * 8
            ),
        ));
    }

    let mut crc = Crc16::new();
    crc.update(&header.to_bytes()[2..]);
    let whole = bits / 8;
    crc.update(&audio[..whole]);
    let rest = bits % 8;
    if rest > 0 {
        let tail = u32::from(audio[whole] >> (8 - rest));
        #[allow(clippy::cast_possible_truncation)]
        crc.update_bits(tail, rest as u32);
    }
    Ok(crc.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpeg::enums::MpegVersion;

    fn header(layer: MpegLayer, bitrate_index: u8, mode: ChannelMode) -> MpegAudioHeader {
        MpegAudioHeader::new(MpegVersion::V1, layer, bitrate_index, 0, mode)
            .unwrap()
            .with_protection(true)
    }

    #[test]
    fn layer1_bits() {
        let stereo = header(MpegLayer::I, 8, ChannelMode::Stereo);
        assert_eq!(protected_bits(&stereo, &[]).unwrap(), 256);

        let mono = header(MpegLayer::I, 8, ChannelMode::SingleChannel);
        assert_eq!(protected_bits(&mono, &[]).unwrap(), 128);

        // bound 8: 4 · (2 · 8 + 24)
        let joint = header(MpegLayer::I, 8, ChannelMode::JointStereo).with_mode_extension(1);
        assert_eq!(protected_bits(&joint, &[]).unwrap(), 160);
    }

    #[test]
    fn layer3_bits() {
        let stereo = header(MpegLayer::III, 9, ChannelMode::Stereo);
        assert_eq!(protected_bits(&stereo, &[]).unwrap(), 256);
        let mono = header(MpegLayer::III, 9, ChannelMode::SingleChannel);
        assert_eq!(protected_bits(&mono, &[]).unwrap(), 136);
    }

    #[test]
    fn layer2_all_zero_allocation() {
        // 192 kbps stereo at 44.1 kHz selects table B.2b (30 subbands):
        // 11 · 4 + 12 · 3 + 7 · 2 = 94 bits per channel, no SCFSI.
        let h = header(MpegLayer::II, 10, ChannelMode::Stereo);
        assert_eq!(protected_bits(&h, &[0; 64]).unwrap(), 188);
    }

    #[test]
    fn layer2_scfsi_counted_for_allocated_subbands() {
        // 48 kbps mono at 44.1 kHz selects table B.2c (8 subbands):
        // 4 + 4 + 6 · 3 = 26 allocation bits.
        let h = header(MpegLayer::II, 2, ChannelMode::SingleChannel);
        // sb0 = 0b0001, sb1 = 0b0001, rest zero
        let audio = [0b0001_0001, 0, 0, 0, 0, 0];
        assert_eq!(protected_bits(&h, &audio).unwrap(), 26 + 4);
    }

    #[test]
    fn layer2_joint_stereo_shares_upper_allocations() {
        // 64 kbps stereo at 44.1 kHz (32 per channel) selects table B.2c.
        // Bound 4: sb 0-3 per channel (4+4+3+3)·2 = 28, sb 4-7 once 4·3 = 12.
        let h = header(MpegLayer::II, 4, ChannelMode::JointStereo);
        assert_eq!(protected_bits(&h, &[0; 8]).unwrap(), 40);

        // Allocate shared subband 4 (bits 28-30) only: both channels carry
        // SCFSI for it.
        let mut audio = [0u8; 8];
        audio[3] = 0b0000_0010;
        assert_eq!(protected_bits(&h, &audio).unwrap(), 40 + 4);
    }

    #[test]
    fn layer2_truncated_allocation() {
        let h = header(MpegLayer::II, 10, ChannelMode::Stereo);
        assert!(matches!(
            protected_bits(&h, &[0; 4]),
            Err(FormatError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn crc_over_partial_byte() {
        // B.2c mono with nothing allocated covers 26 bits: 3 bytes plus the
        // top 2 bits of byte 3.
        let h = header(MpegLayer::II, 2, ChannelMode::SingleChannel);
        let zero = compute(&h, &[0, 0, 0, 0]).unwrap();
        assert_eq!(compute(&h, &[0, 0, 0, 0b0011_1111]).unwrap(), zero);
        assert_ne!(compute(&h, &[0, 0, 1, 0]).unwrap(), zero);
    }

    #[test]
    fn audio_shorter_than_side_info() {
        let h = header(MpegLayer::III, 9, ChannelMode::Stereo);
        assert!(compute(&h, &[0; 31]).is_err());
    }
}
