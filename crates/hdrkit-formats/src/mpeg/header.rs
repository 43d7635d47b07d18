use std::fmt;
use std::time::Duration;

use hdrkit_wire::{HeaderCodec, ParseStatus};

use super::enums::{ChannelMode, ChannelModeExtension, Emphasis, MpegLayer, MpegVersion};
use super::tables::{self, BITRATE_INDEX_INVALID, SAMPLING_INDEX_INVALID};
use crate::Parse;
use crate::error::FormatError;

const FORMAT: &str = "mpeg audio";

/// A decoded 4-byte MPEG audio frame header.
///
/// ```text
/// ┌──────────┬────────────────────────────────────────────┐
/// │ Bits     │ Field                                      │
/// ├──────────┼────────────────────────────────────────────┤
/// │ 0-10     │ frame sync, all ones                       │
/// │ 11-12    │ version                                    │
/// │ 13-14    │ layer                                      │
/// │ 15       │ protection, 0 = CRC-16 follows            │
/// │ 16-19    │ bitrate index                              │
/// │ 20-21    │ sampling rate index                        │
/// │ 22       │ padding                                    │
/// │ 23       │ private                                    │
/// │ 24-25    │ channel mode                               │
/// │ 26-27    │ mode extension                             │
/// │ 28       │ copyright                                  │
/// │ 29       │ original                                   │
/// │ 30-31    │ emphasis                                   │
/// └──────────┴────────────────────────────────────────────┘
/// ```
///
/// Fields are private so a value of this type is always a valid header:
/// the version and layer are not reserved and both indexes resolve. The
/// bitrate and sampling rate are looked up once, on construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MpegAudioHeader {
    version: MpegVersion,
    layer: MpegLayer,
    protected: bool,
    bitrate_index: u8,
    bitrate_kbps: u16,
    sampling_index: u8,
    sampling_rate: u32,
    padding: bool,
    private: bool,
    channel_mode: ChannelMode,
    mode_extension: u8,
    copyright: bool,
    original: bool,
    emphasis: Emphasis,
}

impl MpegAudioHeader {
    pub const LEN: usize = 4;
    /// The 11 sync bits, left-aligned in the header word.
    pub const SYNC_MASK: u32 = 0xFFE0_0000;

    /// A header with every flag clear, no CRC, no emphasis.
    ///
    /// # Errors
    ///
    /// `MalformedHeader` for a reserved version or layer, the invalid
    /// bitrate index (15) or the invalid sampling index (3).
    pub fn new(
        version: MpegVersion,
        layer: MpegLayer,
        bitrate_index: u8,
        sampling_index: u8,
        channel_mode: ChannelMode,
    ) -> Result<Self, FormatError> {
        if version == MpegVersion::Reserved {
            return Err(FormatError::malformed(FORMAT, "reserved version"));
        }
        if layer == MpegLayer::Reserved {
            return Err(FormatError::malformed(FORMAT, "reserved layer"));
        }
        let bitrate_kbps = tables::bitrate_kbps(version, layer, bitrate_index).ok_or_else(|| {
            FormatError::malformed(FORMAT, format!("invalid bitrate index {bitrate_index:#06b}"))
        })?;
        let sampling_rate = tables::sampling_rate(version, sampling_index).ok_or_else(|| {
            FormatError::malformed(
                FORMAT,
                format!("invalid sampling rate index {sampling_index:#04b}"),
            )
        })?;
        Ok(Self {
            version,
            layer,
            protected: false,
            bitrate_index,
            bitrate_kbps,
            sampling_index,
            sampling_rate,
            padding: false,
            private: false,
            channel_mode,
            mode_extension: 0,
            copyright: false,
            original: false,
            emphasis: Emphasis::None,
        })
    }

    #[must_use]
    pub fn with_protection(mut self, on: bool) -> Self {
        self.protected = on;
        self
    }

    #[must_use]
    pub fn with_padding(mut self, on: bool) -> Self {
        self.padding = on;
        self
    }

    #[must_use]
    pub fn with_private(mut self, on: bool) -> Self {
        self.private = on;
        self
    }

    /// Only the low 2 bits are kept.
    #[must_use]
    pub fn with_mode_extension(mut self, bits: u8) -> Self {
        self.mode_extension = bits & 0b11;
        self
    }

    #[must_use]
    pub fn with_copyright(mut self, on: bool) -> Self {
        self.copyright = on;
        self
    }

    #[must_use]
    pub fn with_original(mut self, on: bool) -> Self {
        self.original = on;
        self
    }

    #[must_use]
    pub fn with_emphasis(mut self, emphasis: Emphasis) -> Self {
        self.emphasis = emphasis;
        self
    }

    // ── Packing ─────────────────────────────────────────────────────────

    /// Decode a big-endian header word.
    ///
    /// # Errors
    ///
    /// `MalformedHeader` if the sync bits are not all set, or see
    /// [`new`](Self::new).
    pub fn from_word(word: u32) -> Result<Self, FormatError> {
        if word & Self::SYNC_MASK != Self::SYNC_MASK {
            return Err(FormatError::malformed(FORMAT, "missing frame sync"));
        }
        let field = |shift: u32, mask: u32| {
            #[allow(clippy::cast_possible_truncation)]
            let value = ((word >> shift) & mask) as u8;
            value
        };
        let bit = |shift: u32| field(shift, 1) == 1;

        let version = MpegVersion::from_bits(field(19, 0b11));
        let layer = MpegLayer::from_bits(field(17, 0b11));
        let header = Self::new(
            version,
            layer,
            field(12, 0b1111),
            field(10, 0b11),
            ChannelMode::from_bits(field(6, 0b11)),
        )?;
        Ok(
            header
                .with_protection(!bit(16))
                .with_padding(bit(9))
                .with_private(bit(8))
                .with_mode_extension(field(4, 0b11))
                .with_copyright(bit(3))
                .with_original(bit(2))
                .with_emphasis(Emphasis::from_bits(field(0, 0b11))),
        )
    }

    /// Pack into the 32-bit header word. The single place bits are laid out.
    pub fn to_word(&self) -> u32 {
        let flag = |on: bool, shift: u32| u32::from(on) << shift;
        Self::SYNC_MASK
            | u32::from(self.version.bits()) << 19
            | u32::from(self.layer.bits()) << 17
            | flag(!self.protected, 16)
            | u32::from(self.bitrate_index) << 12
            | u32::from(self.sampling_index) << 10
            | flag(self.padding, 9)
            | flag(self.private, 8)
            | u32::from(self.channel_mode.bits()) << 6
            | u32::from(self.mode_extension) << 4
            | flag(self.copyright, 3)
            | flag(self.original, 2)
            | u32::from(self.emphasis.bits())
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        self.to_word().to_be_bytes()
    }

    /// Whether `buf` starts with something that could become a valid header
    /// once more bytes arrive.
    ///
    /// Checks the sync bits and every field the available bytes already
    /// cover, so garbage is rejected as early as possible.
    fn check_prefix(buf: &[u8]) -> Result<(), FormatError> {
        if let Some(&b0) = buf.first() {
            if b0 != 0xFF {
                return Err(FormatError::malformed(FORMAT, "missing frame sync"));
            }
        }
        if let Some(&b1) = buf.get(1) {
            if b1 & 0xE0 != 0xE0 {
                return Err(FormatError::malformed(FORMAT, "missing frame sync"));
            }
            if MpegVersion::from_bits(b1 >> 3) == MpegVersion::Reserved {
                return Err(FormatError::malformed(FORMAT, "reserved version"));
            }
            if MpegLayer::from_bits(b1 >> 1) == MpegLayer::Reserved {
                return Err(FormatError::malformed(FORMAT, "reserved layer"));
            }
        }
        if let Some(&b2) = buf.get(2) {
            if b2 >> 4 == BITRATE_INDEX_INVALID {
                return Err(FormatError::malformed(FORMAT, "invalid bitrate index 0b1111"));
            }
            if (b2 >> 2) & 0b11 == SAMPLING_INDEX_INVALID {
                return Err(FormatError::malformed(FORMAT, "invalid sampling rate index 0b11"));
            }
        }
        Ok(())
    }

    /// Whether `buf` starts with a complete, valid header.
    pub fn is_header_at(buf: &[u8]) -> bool {
        buf.len() >= Self::LEN && Self::parse(buf).is_complete()
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn version(&self) -> MpegVersion {
        self.version
    }

    pub fn layer(&self) -> MpegLayer {
        self.layer
    }

    /// A CRC-16 follows the header. On the wire this is bit 15 == 0.
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn bitrate_index(&self) -> u8 {
        self.bitrate_index
    }

    /// Bitrate in kbit/s; 0 for free format.
    pub fn bitrate_kbps(&self) -> u16 {
        self.bitrate_kbps
    }

    /// Bitrate in bit/s, `None` for free format.
    pub fn bitrate(&self) -> Option<u32> {
        (self.bitrate_kbps != 0).then(|| u32::from(self.bitrate_kbps) * 1000)
    }

    pub fn is_free_format(&self) -> bool {
        self.bitrate_kbps == 0
    }

    pub fn sampling_index(&self) -> u8 {
        self.sampling_index
    }

    /// Sampling rate in Hz.
    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    pub fn is_padded(&self) -> bool {
        self.padding
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn channel_mode(&self) -> ChannelMode {
        self.channel_mode
    }

    pub fn channels(&self) -> u8 {
        self.channel_mode.channels()
    }

    /// Raw 2-bit mode extension.
    pub fn mode_extension(&self) -> u8 {
        self.mode_extension
    }

    pub fn channel_mode_extension(&self) -> ChannelModeExtension {
        ChannelModeExtension::decode(self.layer, self.mode_extension)
    }

    pub fn is_copyrighted(&self) -> bool {
        self.copyright
    }

    pub fn is_original(&self) -> bool {
        self.original
    }

    pub fn emphasis(&self) -> Emphasis {
        self.emphasis
    }

    // ── Derived values ──────────────────────────────────────────────────

    pub fn samples_per_frame(&self) -> u32 {
        tables::samples_per_frame(self.version, self.layer)
    }

    /// Layer III side information length in bytes.
    pub fn side_info_len(&self) -> usize {
        tables::side_info_len(self.version, self.channel_mode)
    }

    /// Bytes taken by the CRC-16 field: 2 if protected, else 0.
    pub fn crc_len(&self) -> usize {
        if self.protected { 2 } else { 0 }
    }

    /// Whole frame length in bytes, header included.
    ///
    /// Layer I counts in 4-byte slots, so its padding adds 4 bytes:
    ///
    /// ```text
    /// Layer I          (12 · bitrate / rate + padding) · 4
    /// Layer II         144 · bitrate / rate + padding
    /// Layer III  V1    144 · bitrate / rate + padding
    /// Layer III  V2    72  · bitrate / rate + padding
    /// ```
    ///
    /// Each formula floors once, at the end: a Layer I frame at 44.1 kHz is
    /// not a whole number of slots. `None` for free format, whose length is only
    /// known from the distance to the next sync.
    pub fn frame_length(&self) -> Option<usize> {
        let bitrate = u64::from(self.bitrate()?);
        let rate = u64::from(self.sampling_rate);
        let pad = u64::from(self.padding);
        let len = match (self.layer, self.version) {
            (MpegLayer::I, _) => (48 * bitrate + 4 * pad * rate) / rate,
            (MpegLayer::III, MpegVersion::V2 | MpegVersion::V2_5) => 72 * bitrate / rate + pad,
            _ => 144 * bitrate / rate + pad,
        };
        usize::try_from(len).ok()
    }

    /// Audio payload length: frame length minus header and CRC.
    pub fn audio_data_len(&self) -> Option<usize> {
        self
            .frame_length()?
            .checked_sub(Self::LEN + self.crc_len())
    }

    /// Playing time of one frame.
    pub fn duration(&self) -> Duration {
        let nanos =
            u64::from(self.samples_per_frame()) * 1_000_000_000 / u64::from(self.sampling_rate);
        Duration::from_nanos(nanos)
    }
}

impl HeaderCodec for MpegAudioHeader {
    type Error = FormatError;

    fn parse(buf: &[u8]) -> Parse<Self> {
        if let Err(e) = Self::check_prefix(buf) {
            return ParseStatus::Invalid(e);
        }
        let Some(bytes) = buf.get(..Self::LEN) else {
            return ParseStatus::NeedMore(Self::LEN - buf.len());
        };
        let word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        match Self::from_word(word) {
            Ok(value) => ParseStatus::Complete {
                value,
                consumed: Self::LEN,
            },
            Err(e) => ParseStatus::Invalid(e),
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        out.extend_from_slice(&self.to_bytes());
        Ok(Self::LEN)
    }
}

impl fmt::Display for MpegAudioHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, ", self.version, self.layer)?;
        match self.bitrate() {
            Some(_) => write!(f, "{} kbps", self.bitrate_kbps)?,
            None => f.write_str("free format")?,
        }
        write!(f, ", {} Hz, {}", self.sampling_rate, self.channel_mode)?;
        if self.channel_mode == ChannelMode::JointStereo {
            write!(f, " ({})", self.channel_mode_extension())?;
        }
        if self.emphasis != Emphasis::None {
            write!(f, ", emphasis {}", self.emphasis)?;
        }
        for (on, name) in [
            (self.protected, "CRC"),
            (self.padding, "padded"),
            (self.private, "private"),
            (self.copyright, "copyright"),
            (self.original, "original"),
        ] {
            if on {
                write!(f, ", {name}")?;
            }
        }
        if let Some(len) = self.frame_length() {
            write!(f, ", {len} bytes")?;
        }
        let micros = self.duration().as_micros();
        write!(f, ", {}.{:03} ms", micros / 1000, micros % 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// 128 kbps, 44.1 kHz, MPEG-1 Layer III, joint stereo (M/S), original.
    const COMMON: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];

    fn parse_ok(buf: &[u8]) -> MpegAudioHeader {
        match MpegAudioHeader::parse(buf) {
            ParseStatus::Complete { value, consumed } => {
                assert_eq!(consumed, 4);
                value
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn decode_common_header() {
        let header = parse_ok(&COMMON);
        assert_eq!(header.version(), MpegVersion::V1);
        assert_eq!(header.layer(), MpegLayer::III);
        assert!(!header.is_protected());
        assert_eq!(header.bitrate(), Some(128_000));
        assert_eq!(header.sampling_rate(), 44_100);
        assert!(!header.is_padded());
        assert_eq!(header.channel_mode(), ChannelMode::JointStereo);
        assert_eq!(
            header.channel_mode_extension(),
            ChannelModeExtension::Stereo {
                intensity: false,
                mid_side: true
            }
        );
        assert!(header.is_original());
        assert_eq!(header.emphasis(), Emphasis::None);
        assert_eq!(header.to_bytes(), COMMON);
    }

    #[test]
    fn frame_length_128k_44k_layer3() {
        let header = parse_ok(&COMMON);
        assert_eq!(header.frame_length(), Some(417));
        assert_eq!(header.with_padding(true).frame_length(), Some(418));
        assert_eq!(header.audio_data_len(), Some(413));
        assert_eq!(header.with_protection(true).audio_data_len(), Some(411));
    }

    #[test]
    fn frame_length_per_layer() {
        let l1 = MpegAudioHeader::new(MpegVersion::V1, MpegLayer::I, 12, 1, ChannelMode::Stereo)
            .unwrap();
        // 384 kbps at 48 kHz: 12 * 8 = 96 slots
        assert_eq!(l1.frame_length(), Some(384));
        assert_eq!(l1.with_padding(true).frame_length(), Some(388));

        // 32 kbps at 44.1 kHz: 8.707 slots, 34.83 bytes
        let l1 = MpegAudioHeader::new(MpegVersion::V1, MpegLayer::I, 1, 0, ChannelMode::Stereo)
            .unwrap();
        assert_eq!(l1.frame_length(), Some(34));
        assert_eq!(l1.with_padding(true).frame_length(), Some(38));

        let l2 = MpegAudioHeader::new(MpegVersion::V1, MpegLayer::II, 10, 1, ChannelMode::Stereo)
            .unwrap();
        // 192 kbps at 48 kHz
        assert_eq!(l2.frame_length(), Some(576));

        let lsf = MpegAudioHeader::new(MpegVersion::V2, MpegLayer::III, 8, 2, ChannelMode::Stereo)
            .unwrap();
        // 64 kbps at 16 kHz
        assert_eq!(lsf.frame_length(), Some(288));
    }

    #[test]
    fn durations() {
        let header = parse_ok(&COMMON);
        assert_eq!(header.samples_per_frame(), 1152);
        assert_eq!(header.duration(), Duration::from_nanos(26_122_448));

        let lsf = MpegAudioHeader::new(
            MpegVersion::V2_5,
            MpegLayer::III,
            1,
            2,
            ChannelMode::SingleChannel,
        )
        .unwrap();
        assert_eq!(lsf.samples_per_frame(), 576);
        assert_eq!(lsf.duration(), Duration::from_millis(72));
        assert_eq!(lsf.side_info_len(), 9);
    }

    #[test]
    fn free_format_has_no_length() {
        let header = parse_ok(&[0xFF, 0xFB, 0x00, 0x00]);
        assert!(header.is_free_format());
        assert_eq!(header.bitrate(), None);
        assert_eq!(header.frame_length(), None);
    }

    #[test]
    fn invalid_indexes_rejected() {
        assert!(MpegAudioHeader::parse(&[0xFF, 0xFB, 0xF0, 0x00]).is_invalid());
        assert!(MpegAudioHeader::parse(&[0xFF, 0xFB, 0x9C, 0x00]).is_invalid());
    }

    #[test]
    fn reserved_version_and_layer_rejected() {
        // version 01
        assert!(MpegAudioHeader::parse(&[0xFF, 0xEB]).is_invalid());
        // layer 00
        assert!(MpegAudioHeader::parse(&[0xFF, 0xF9]).is_invalid());
    }

    #[test]
    fn sync_checked_on_partial_input() {
        assert!(MpegAudioHeader::parse(&[0xFE]).is_invalid());
        assert!(MpegAudioHeader::parse(&[0xFF, 0x1B]).is_invalid());
        assert!(matches!(
            MpegAudioHeader::parse(&[0xFF, 0xFB]),
            ParseStatus::NeedMore(2)
        ));
        assert!(matches!(MpegAudioHeader::parse(&[]), ParseStatus::NeedMore(4)));
    }

    #[test]
    fn display_summary() {
        let header = parse_ok(&COMMON);
        assert_eq!(
            header.to_string(),
            "MPEG Version 1, Layer III, 128 kbps, 44100 Hz, Joint Stereo \
              (intensity stereo off, M/S stereo on), original, 417 bytes, 26.122 ms"
        );
    }

    fn valid_word() -> impl Strategy<Value = u32> {
        (
            prop_oneof![Just(0u32), Just(2), Just(3)],
            1u32..=3,
            0u32..=1,
            0u32..=14,
            0u32..=2,
            0u32..(1 << 10),
        )
            .prop_map(|(version, layer, prot, bitrate, sampling, low)| {
                MpegAudioHeader::SYNC_MASK
                    | version << 19
                    | layer << 17
                    | prot << 16
                    | bitrate << 12
                    | sampling << 10
                    | low
            })
    }

    proptest! {
        #[test]
        fn every_valid_pattern_roundtrips(word in valid_word()) {
            let bytes = word.to_be_bytes();
            let header = parse_ok(&bytes);
            prop_assert_eq!(header.encode().unwrap(), bytes.to_vec());
        }

        #[test]
        fn invalid_bitrate_rejected_regardless(word in valid_word()) {
            let bytes = (word | 0xF << 12).to_be_bytes();
            prop_assert!(MpegAudioHeader::parse(&bytes).is_invalid());
        }

        #[test]
        fn invalid_sampling_rejected_regardless(word in valid_word()) {
            let bytes = (word | 0b11 << 10).to_be_bytes();
            prop_assert!(MpegAudioHeader::parse(&bytes).is_invalid());
        }
    }
}
