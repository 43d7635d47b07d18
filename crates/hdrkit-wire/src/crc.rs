//! Checksums used by the header formats.
//!
//! GZIP's FHCRC is the low 16 bits of a standard CRC-32 (delegated to
//! `crc32fast`). MPEG audio's protection word is a different beast: the
//! ISO 11172-3 CRC-16 with polynomial `0x8005`, initial value `0xFFFF`,
//! fed MSB-first over an arbitrary number of *bits*, since Layer I/II
//! protected regions do not end on byte boundaries.

/// Standard CRC-32 (IEEE 802.3, reflected, as used by GZIP and zlib).
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Generator polynomial of the MPEG audio CRC-16.
pub const CRC16_POLY: u16 = 0x8005;

/// Initial register value of the MPEG audio CRC-16.
pub const CRC16_INIT: u16 = 0xFFFF;

/// Bitwise CRC-16 accumulator, MSB first, no reflection, no final XOR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Crc16 {
    state: u16,
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc16 {
    pub fn new() -> Self {
        Self { state: CRC16_INIT }
    }

    /// Feed whole bytes.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.update_bits(u32::from(byte), 8);
        }
    }

    /// Feed the low `count` bits of `value`, most significant first.
    ///
    /// `count` is clamped to 32.
    pub fn update_bits(&mut self, value: u32, count: u32) {
        let count = count.min(32);
        for i in (0..count).rev() {
            let bit = (value >> i) & 1 == 1;
            let top = self.state & 0x8000 != 0;
            self.state <<= 1;
            if top != bit {
                self.state ^= CRC16_POLY;
            }
        }
    }

    pub fn value(&self) -> u16 {
        self.state
    }
}
