use crate::error::WireError;

/// Number of bytes in an ID3v2 synchsafe integer.
pub const SYNCHSAFE_LEN: usize = 4;

/// Largest value a 4-byte synchsafe integer can hold (28 significant bits).
pub const SYNCHSAFE_MAX: u32 = (1 << 28) - 1;

/// Encode a value as a 4-byte synchsafe integer.
///
/// Each output byte carries 7 bits of the value with its most significant
/// bit forced to 0, most significant group first. No encoded byte can be
/// `>= 0x80`, so the bytes can never be mistaken for an MPEG frame sync.
///
/// | Value       | Encoded bytes             |
/// |-------------|---------------------------|
/// | 0           | `[0x00, 0x00, 0x00, 0x00]` |
/// | 127         | `[0x00, 0x00, 0x00, 0x7F]` |
/// | 128         | `[0x00, 0x00, 0x01, 0x00]` |
/// | 1000        | `[0x00, 0x00, 0x07, 0x68]` |
/// | 0x0FFF_FFFF | `[0x7F, 0x7F, 0x7F, 0x7F]` |
///
/// # Errors
///
/// [`WireError::ValueOutOfRange`] if `value` exceeds [`SYNCHSAFE_MAX`].
pub fn encode_synchsafe(value: u32) -> Result<[u8; SYNCHSAFE_LEN], WireError> {
    if value > SYNCHSAFE_MAX {
        return Err(WireError::ValueOutOfRange {
            what: "synchsafe",
            value: u64::from(value),
            max: u64::from(SYNCHSAFE_MAX),
        });
    }

    let mut out = [0u8; SYNCHSAFE_LEN];
    for (i, byte) in out.iter_mut().enumerate() {
        let shift = 7 * (SYNCHSAFE_LEN - 1 - i);
        // Take the 7-bit group for this position
        #[allow(clippy::cast_possible_truncation)]
        let group = ((value >> shift) & 0x7F) as u8;
        *byte = group;
    }
    Ok(out)
}

/// Decode a 4-byte synchsafe integer from the start of `buf`.
///
/// # Errors
///
/// - [`WireError::InsufficientData`] if `buf` holds fewer than 4 bytes.
/// - [`WireError::NotSynchsafe`] if any of the 4 bytes has its high bit set.
pub fn decode_synchsafe(buf: &[u8]) -> Result<u32, WireError> {
    let bytes = buf
        .get(..SYNCHSAFE_LEN)
        .ok_or_else(|| WireError::short(0, SYNCHSAFE_LEN, buf.len()))?;

    let mut value: u32 = 0;
    for (offset, &byte) in bytes.iter().enumerate() {
        if byte & 0x80 != 0 {
            return Err(WireError::NotSynchsafe {
                offset,
                value: byte,
            });
        }
        value = (value << 7) | u32::from(byte);
    }
    Ok(value)
}
