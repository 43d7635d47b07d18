//! Static lookup tables from ISO/IEC 11172-3 and 13818-3.
//!
//! Everything here is a `const`: shared by every thread, never mutated.

use super::enums::{ChannelMode, MpegLayer, MpegVersion};

// ── Bitrates ──────────────────────────────────────────────────────────

/// Bitrates in kbit/s, indexed by the 4-bit bitrate field.
///
/// Index 0 is free format, index 15 is invalid (`None` from
/// [`bitrate_kbps`]). MPEG-2.5 shares the MPEG-2 rows.
///
/// ```text
/// ┌───────┬──────┬──────┬──────┬──────┬──────────┐
/// │ index │ V1 I │ V1 II│V1 III│ V2 I │V2 II/III │
/// ├───────┼──────┼──────┼──────┼──────┼──────────┤
/// │  1    │  32  │  32  │  32  │  32  │    8     │
/// │  2    │  64  │  48  │  40  │  48  │   16     │
/// │  ...  │      │      │      │      │          │
/// │  14   │ 448  │ 384  │ 320  │ 256  │  160     │
/// └───────┴──────┴──────┴──────┴──────┴──────────┘
/// ```
const BITRATES_KBPS: [[u16; 15]; 5] = [
    // V1, Layer I
    [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448],
    // V1, Layer II
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384],
    // V1, Layer III
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320],
    // V2/V2.5, Layer I
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256],
    // V2/V2.5, Layers II and III
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
];

/// The invalid bitrate index.
pub const BITRATE_INDEX_INVALID: u8 = 0b1111;
/// The free-format bitrate index.
pub const BITRATE_INDEX_FREE: u8 = 0;

/// Bitrate in kbit/s. `Some(0)` is free format; `None` is the invalid
/// index or a reserved version/layer.
pub fn bitrate_kbps(version: MpegVersion, layer: MpegLayer, index: u8) -> Option<u16> {
    let row = match (version, layer) {
        (MpegVersion::V1, MpegLayer::I) => 0,
        (MpegVersion::V1, MpegLayer::II) => 1,
        (MpegVersion::V1, MpegLayer::III) => 2,
        (MpegVersion::V2 | MpegVersion::V2_5, MpegLayer::I) => 3,
        (MpegVersion::V2 | MpegVersion::V2_5, MpegLayer::II | MpegLayer::III) => 4,
        _ => return None,
    };
    BITRATES_KBPS[row].get(usize::from(index)).copied()
}

// ── Sampling rates ────────────────────────────────────────────────────

/// Sampling rates in Hz, indexed by the 2-bit field; index 3 is invalid.
const SAMPLING_RATES: [[u32; 3]; 3] = [
    [44_100, 48_000, 32_000], // V1
    [22_050, 24_000, 16_000], // V2
    [11_025, 12_000, 8_000],  // V2.5
];

pub const SAMPLING_INDEX_INVALID: u8 = 0b11;

pub fn sampling_rate(version: MpegVersion, index: u8) -> Option<u32> {
    let row = match version {
        MpegVersion::V1 => 0,
        MpegVersion::V2 => 1,
        MpegVersion::V2_5 => 2,
        MpegVersion::Reserved => return None,
    };
    SAMPLING_RATES[row].get(usize::from(index)).copied()
}

// ── Per-layer constants ───────────────────────────────────────────────

pub fn samples_per_frame(version: MpegVersion, layer: MpegLayer) -> u32 {
    match (layer, version) {
        (MpegLayer::I, _) => 384,
        (MpegLayer::III, MpegVersion::V2 | MpegVersion::V2_5) => 576,
        _ => 1152,
    }
}

/// Layer III side information length in bytes.
pub fn side_info_len(version: MpegVersion, mode: ChannelMode) -> usize {
    match (version, mode) {
        (MpegVersion::V1, ChannelMode::SingleChannel) => 17,
        (MpegVersion::V1, _) => 32,
        (_, ChannelMode::SingleChannel) => 9,
        _ => 17,
    }
}

// ── Layer II bit allocation ───────────────────────────────────────────

/// Shape of a Layer II bit-allocation table: how many subbands carry an
/// allocation, and how wide each allocation field is.
///
/// Only the field widths matter here (for CRC coverage); the
/// quantisation classes behind each allocation code are not needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationTable {
    pub name: &'static str,
    nbal: &'static [u8],
}

impl AllocationTable {
    /// Number of subbands with an allocation field.
    pub fn sblimit(&self) -> usize {
        self.nbal.len()
    }

    /// Width of subband `sb`'s allocation field in bits.
    pub fn nbal(&self, sb: usize) -> u8 {
        self.nbal[sb]
    }
}

/// ISO 11172-3 Table B.2a: 27 subbands.
pub const ALLOC_A: AllocationTable = AllocationTable {
    name: "B.2a",
    nbal: &[
        4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, // 0-10
        3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, // 11-22
        2, 2, 2, 2, // 23-26
    ],
};

/// ISO 11172-3 Table B.2b: 30 subbands.
pub const ALLOC_B: AllocationTable = AllocationTable {
    name: "B.2b",
    nbal: &[
        4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, // 0-10
        3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, // 11-22
        2, 2, 2, 2, 2, 2, 2, // 23-29
    ],
};

/// ISO 11172-3 Table B.2c: 8 subbands, low bitrates.
pub const ALLOC_C: AllocationTable = AllocationTable {
    name: "B.2c",
    nbal: &[4, 4, 3, 3, 3, 3, 3, 3],
};

/// ISO 11172-3 Table B.2d: 12 subbands, low bitrates at 32 kHz.
pub const ALLOC_D: AllocationTable = AllocationTable {
    name: "B.2d",
    nbal: &[4, 4, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3],
};

/// ISO 13818-3 Table B.1: the single table for MPEG-2/2.5.
pub const ALLOC_LSF: AllocationTable = AllocationTable {
    name: "13818-3 B.1",
    nbal: &[
        4, 4, 4, 4, // 0-3
        3, 3, 3, 3, 3, 3, 3, // 4-10
        2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, // 11-29
    ],
};

/// Pick the Layer II allocation table for a frame.
///
/// MPEG-1 selects by sampling rate and per-channel bitrate; MPEG-2 and
/// 2.5 always use the LSF table.
pub fn layer2_allocation(
    version: MpegVersion,
    bitrate_kbps: u16,
    channels: u8,
    sampling_rate: u32,
) -> AllocationTable {
    if version.is_lsf() {
        return ALLOC_LSF;
    }
    let per_channel = bitrate_kbps / u16::from(channels.max(1));
    if (sampling_rate == 48_000 && per_channel >= 56) || (56..=80).contains(&per_channel) {
        ALLOC_A
    } else if sampling_rate != 48_000 && per_channel >= 96 {
        ALLOC_B
    } else if sampling_rate != 32_000 && per_channel <= 48 {
        ALLOC_C
    } else {
        ALLOC_D
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitrate_lookup() {
        assert_eq!(bitrate_kbps(MpegVersion::V1, MpegLayer::III, 9), Some(128));
        assert_eq!(bitrate_kbps(MpegVersion::V1, MpegLayer::I, 14), Some(448));
        assert_eq!(bitrate_kbps(MpegVersion::V1, MpegLayer::II, 14), Some(384));
        assert_eq!(bitrate_kbps(MpegVersion::V2_5, MpegLayer::III, 1), Some(8));
        assert_eq!(bitrate_kbps(MpegVersion::V2, MpegLayer::I, 9), Some(144));
        assert_eq!(bitrate_kbps(MpegVersion::V1, MpegLayer::III, 0), Some(0));
    }

    #[test]
    fn invalid_bitrate_index() {
        assert_eq!(
            bitrate_kbps(MpegVersion::V1, MpegLayer::III, BITRATE_INDEX_INVALID),
            None
        );
        assert_eq!(bitrate_kbps(MpegVersion::Reserved, MpegLayer::III, 9), None);
        assert_eq!(bitrate_kbps(MpegVersion::V1, MpegLayer::Reserved, 9), None);
    }

    #[test]
    fn sampling_lookup() {
        assert_eq!(sampling_rate(MpegVersion::V1, 0), Some(44_100));
        assert_eq!(sampling_rate(MpegVersion::V2, 1), Some(24_000));
        assert_eq!(sampling_rate(MpegVersion::V2_5, 2), Some(8_000));
        assert_eq!(sampling_rate(MpegVersion::V1, SAMPLING_INDEX_INVALID), None);
    }

    #[test]
    fn side_info_lengths() {
        assert_eq!(side_info_len(MpegVersion::V1, ChannelMode::Stereo), 32);
        assert_eq!(side_info_len(MpegVersion::V1, ChannelMode::SingleChannel), 17);
        assert_eq!(side_info_len(MpegVersion::V2, ChannelMode::JointStereo), 17);
        assert_eq!(side_info_len(MpegVersion::V2_5, ChannelMode::SingleChannel), 9);
    }

    #[test]
    fn allocation_table_shapes() {
        assert_eq!(ALLOC_A.sblimit(), 27);
        assert_eq!(ALLOC_B.sblimit(), 30);
        assert_eq!(ALLOC_C.sblimit(), 8);
        assert_eq!(ALLOC_D.sblimit(), 12);
        assert_eq!(ALLOC_LSF.sblimit(), 30);
    }

    #[test]
    fn allocation_table_selection() {
        // 192 kbps stereo at 44.1 kHz: 96 per channel
        assert_eq!(layer2_allocation(MpegVersion::V1, 192, 2, 44_100), ALLOC_B);
        // 128 kbps stereo at 48 kHz: 64 per channel
        assert_eq!(layer2_allocation(MpegVersion::V1, 128, 2, 48_000), ALLOC_A);
        // 64 kbps stereo at 44.1 kHz: 32 per channel
        assert_eq!(layer2_allocation(MpegVersion::V1, 64, 2, 44_100), ALLOC_C);
        // 48 kbps mono at 32 kHz
        assert_eq!(layer2_allocation(MpegVersion::V1, 48, 1, 32_000), ALLOC_D);
        assert_eq!(layer2_allocation(MpegVersion::V2, 160, 2, 24_000), ALLOC_LSF);
    }
}
