use std::fmt;

// ── Macro for 2-bit header fields ─────────────────────────────────────
//
// Four of the MPEG header fields are 2 bits wide and every bit pattern
// names a variant (reserved patterns included), so decoding is total and
// the only validation happens in the header parser. The macro keeps the
// pattern table and the display name next to each variant. Variants are
// listed in pattern order, 0b00 first.

macro_rules! bits_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $bits:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, indexed by its wire pattern.
            pub const ALL: [Self; 4] = [$( Self::$variant ),+];

            /// Decode the low 2 bits of `bits`.
            pub fn from_bits(bits: u8) -> Self {
                Self::ALL[usize::from(bits & 0b11)]
            }

            /// The 2-bit wire pattern.
            pub fn bits(self) -> u8 {
                match self {
                    $( Self::$variant => $bits ),+
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $label ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

bits_enum! {
    /// Header bits 11-12.
    pub enum MpegVersion {
        V2_5 = 0b00 => "MPEG Version 2.5",
        Reserved = 0b01 => "reserved version",
        V2 = 0b10 => "MPEG Version 2",
        V1 = 0b11 => "MPEG Version 1",
    }
}

bits_enum! {
    /// Header bits 13-14.
    pub enum MpegLayer {
        Reserved = 0b00 => "reserved layer",
        III = 0b01 => "Layer III",
        II = 0b10 => "Layer II",
        I = 0b11 => "Layer I",
    }
}

bits_enum! {
    /// Header bits 24-25.
    pub enum ChannelMode {
        Stereo = 0b00 => "Stereo",
        JointStereo = 0b01 => "Joint Stereo",
        DualChannel = 0b10 => "Dual Channel",
        SingleChannel = 0b11 => "Single Channel",
    }
}

bits_enum! {
    /// Header bits 30-31.
    pub enum Emphasis {
        None = 0b00 => "none",
        Ms50_15 = 0b01 => "50/15 ms",
        Reserved = 0b10 => "reserved",
        CcitJ17 = 0b11 => "CCIT J.17",
    }
}

impl MpegVersion {
    /// MPEG-2 and 2.5 are the "low sampling frequency" extensions.
    pub fn is_lsf(self) -> bool {
        matches!(self, Self::V2 | Self::V2_5)
    }
}

impl ChannelMode {
    pub fn channels(self) -> u8 {
        match self {
            Self::SingleChannel => 1,
            _ => 2,
        }
    }
}

/// Header bits 26-27, interpreted by layer. Only meaningful in joint
/// stereo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelModeExtension {
    /// Layers I and II: subbands from `bound` upward are intensity stereo.
    Bound(u8),
    /// Layer III: which joint-stereo tools are on.
    Stereo { intensity: bool, mid_side: bool },
}

impl ChannelModeExtension {
    pub fn decode(layer: MpegLayer, bits: u8) -> Self {
        let bits = bits & 0b11;
        match layer {
            MpegLayer::III => Self::Stereo {
                intensity: bits & 0b01 != 0,
                mid_side: bits & 0b10 != 0,
            },
            _ => Self::Bound((bits + 1) * 4),
        }
    }
}

impl fmt::Display for ChannelModeExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bound(bound) => write!(f, "bands {bound} to 31"),
            Self::Stereo {
                intensity,
                mid_side,
            } => {
                let on = |b: &bool| if *b { "on" } else { "off" };
                write!(
                    f,
                    "intensity stereo {}, M/S stereo {}",
                    on(intensity),
                    on(mid_side)
                )
            }
        }
    }
}
