use crate::error::WireError;

/// Most-significant-bit-first reader over a byte slice.
///
/// MPEG audio packs its header and side information as a bitstream with
/// fields that straddle byte boundaries. The reader tracks an absolute bit
/// position; it never advances past the end of the slice.
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current position, in bits from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bits left before the end of the slice.
    pub fn remaining(&self) -> usize {
        self.buf.len() * 8 - self.pos
    }

    /// Read `n` bits (at most 32) as an unsigned value.
    ///
    /// # Errors
    ///
    /// - [`WireError::ValueOutOfRange`] if `n > 32`.
    /// - [`WireError::InsufficientData`] if fewer than `n` bits remain;
    ///   `needed` is rounded up to whole bytes. The position is unchanged.
    pub fn read_bits(&mut self, n: u32) -> Result<u32, WireError> {
        if n > 32 {
            return Err(WireError::ValueOutOfRange {
                what: "bit count",
                value: u64::from(n),
                max: 32,
            });
        }
        let n = n as usize;
        if n > self.remaining() {
            return Err(WireError::InsufficientData {
                needed: (n - self.remaining()).div_ceil(8),
            });
        }

        let mut value: u64 = 0;
        for _ in 0..n {
            let byte = self.buf[self.pos / 8];
            let bit = (byte >> (7 - (self.pos % 8))) & 1;
            value = (value << 1) | u64::from(bit);
            self.pos += 1;
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(value as u32)
    }

    /// Read a single bit as a boolean.
    ///
    /// # Errors
    ///
    /// [`WireError::InsufficientData`] at end of slice.
    pub fn read_bit(&mut self) -> Result<bool, WireError> {
        self.read_bits(1).map(|b| b == 1)
    }

    /// Advance `n` bits without decoding them.
    ///
    /// # Errors
    ///
    /// [`WireError::InsufficientData`] if fewer than `n` bits remain.
    pub fn skip_bits(&mut self, n: usize) -> Result<(), WireError> {
        if n > self.remaining() {
            return Err(WireError::InsufficientData {
                needed: (n - self.remaining()).div_ceil(8),
            });
        }
        self.pos += n;
        Ok(())
    }
}
