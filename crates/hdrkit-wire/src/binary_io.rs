//! Unsigned fixed-width field access over byte buffers and streams.
//!
//! Every function here is stateless: the caller passes the buffer and the
//! offset and gets either the value or a [`WireError::InsufficientData`]
//! telling it how many bytes were missing. Nothing ever reads past the end
//! of the slice.
//!
//! GZIP and RIFF store multi-byte fields little-endian. ID3v2 frame sizes
//! and the MPEG CRC-16 are big-endian, so both orders are provided.

use std::io::{self, Read, Write};

use crate::error::WireError;

// ── Buffer readers ────────────────────────────────────────────────────────────

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], WireError> {
    offset
        .checked_add(N)
        .and_then(|end| buf.get(offset..end))
        .and_then(|slice| <[u8; N]>::try_from(slice).ok())
        .ok_or_else(|| WireError::short(offset, N, buf.len()))
}

/// Read one unsigned byte at `offset`.
///
/// # Errors
///
/// [`WireError::InsufficientData`] if `offset` is past the end of `buf`.
pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8, WireError> {
    read_array::<1>(buf, offset).map(|[b]| b)
}

/// Read a little-endian `u16` at `offset`.
///
/// # Errors
///
/// [`WireError::InsufficientData`] if fewer than 2 bytes remain.
pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16, WireError> {
    read_array(buf, offset).map(u16::from_le_bytes)
}

/// Read a little-endian `u32` at `offset`.
///
/// # Errors
///
/// [`WireError::InsufficientData`] if fewer than 4 bytes remain.
pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32, WireError> {
    read_array(buf, offset).map(u32::from_le_bytes)
}

/// Read a big-endian `u16` at `offset`.
///
/// # Errors
///
/// [`WireError::InsufficientData`] if fewer than 2 bytes remain.
pub fn read_u16_be(buf: &[u8], offset: usize) -> Result<u16, WireError> {
    read_array(buf, offset).map(u16::from_be_bytes)
}

/// Read a big-endian `u32` at `offset`.
///
/// # Errors
///
/// [`WireError::InsufficientData`] if fewer than 4 bytes remain.
pub fn read_u32_be(buf: &[u8], offset: usize) -> Result<u32, WireError> {
    read_array(buf, offset).map(u32::from_be_bytes)
}

/// Copy `N` raw bytes starting at `offset` (FOURCC tags, magic numbers).
///
/// # Errors
///
/// [`WireError::InsufficientData`] if fewer than `N` bytes remain.
pub fn read_bytes<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], WireError> {
    read_array(buf, offset)
}

// ── Buffer writers ────────────────────────────────────────────────────────────

fn write_array(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<(), WireError> {
    let available = buf.len();
    let dst = offset
        .checked_add(bytes.len())
        .and_then(|end| buf.get_mut(offset..end))
        .ok_or_else(|| WireError::short(offset, bytes.len(), available))?;
    dst.copy_from_slice(bytes);
    Ok(())
}

/// Write one byte at `offset`.
///
/// # Errors
///
/// [`WireError::InsufficientData`] if `offset` is past the end of `buf`.
pub fn write_u8(buf: &mut [u8], offset: usize, value: u8) -> Result<(), WireError> {
    write_array(buf, offset, &[value])
}

/// Write a little-endian `u16` at `offset`.
///
/// # Errors
///
/// [`WireError::InsufficientData`] if fewer than 2 bytes remain.
pub fn write_u16_le(buf: &mut [u8], offset: usize, value: u16) -> Result<(), WireError> {
    write_array(buf, offset, &value.to_le_bytes())
}

/// Write a little-endian `u32` at `offset`.
///
/// # Errors
///
/// [`WireError::InsufficientData`] if fewer than 4 bytes remain.
pub fn write_u32_le(buf: &mut [u8], offset: usize, value: u32) -> Result<(), WireError> {
    write_array(buf, offset, &value.to_le_bytes())
}

/// Write a big-endian `u16` at `offset`.
///
/// # Errors
///
/// [`WireError::InsufficientData`] if fewer than 2 bytes remain.
pub fn write_u16_be(buf: &mut [u8], offset: usize, value: u16) -> Result<(), WireError> {
    write_array(buf, offset, &value.to_be_bytes())
}

/// Write a big-endian `u32` at `offset`.
///
/// # Errors
///
/// [`WireError::InsufficientData`] if fewer than 4 bytes remain.
pub fn write_u32_be(buf: &mut [u8], offset: usize, value: u32) -> Result<(), WireError> {
    write_array(buf, offset, &value.to_be_bytes())
}

// ── Stream forms ──────────────────────────────────────────────────────────────
//
// Sequential consumption without pre-buffering. A reader that hits EOF
// part-way through a field reports how many bytes of the field were still
// missing instead of a bare UnexpectedEof.

fn read_array_from<R: Read, const N: usize>(r: &mut R) -> Result<[u8; N], WireError> {
    let mut out = [0u8; N];
    let mut filled = 0;
    while filled < N {
        match r.read(&mut out[filled..]) {
            Ok(0) => {
                return Err(WireError::InsufficientData {
                    needed: N - filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(out)
}

/// Read one byte from a stream.
///
/// # Errors
///
/// [`WireError::InsufficientData`] at end of stream, [`WireError::Io`]
/// for any other read failure.
pub fn read_u8_from<R: Read>(r: &mut R) -> Result<u8, WireError> {
    read_array_from::<R, 1>(r).map(|[b]| b)
}

/// Read a little-endian `u16` from a stream.
///
/// # Errors
///
/// See [`read_u8_from`].
pub fn read_u16_le_from<R: Read>(r: &mut R) -> Result<u16, WireError> {
    read_array_from(r).map(u16::from_le_bytes)
}

/// Read a little-endian `u32` from a stream.
///
/// # Errors
///
/// See [`read_u8_from`].
pub fn read_u32_le_from<R: Read>(r: &mut R) -> Result<u32, WireError> {
    read_array_from(r).map(u32::from_le_bytes)
}

/// Write one byte to a stream.
///
/// # Errors
///
/// [`WireError::Io`] if the writer fails.
pub fn write_u8_to<W: Write>(w: &mut W, value: u8) -> Result<(), WireError> {
    w.write_all(&[value])?;
    Ok(())
}

/// Write a little-endian `u16` to a stream.
///
/// # Errors
///
/// [`WireError::Io`] if the writer fails.
pub fn write_u16_le_to<W: Write>(w: &mut W, value: u16) -> Result<(), WireError> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian `u32` to a stream.
///
/// # Errors
///
/// [`WireError::Io`] if the writer fails.
pub fn write_u32_le_to<W: Write>(w: &mut W, value: u32) -> Result<(), WireError> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_fields() {
        let buf = [0x04, 0x03, 0x02, 0x01];
        assert_eq!(read_u8(&buf, 3).unwrap(), 0x01);
        assert_eq!(read_u16_le(&buf, 0).unwrap(), 0x0304);
        assert_eq!(read_u32_le(&buf, 0).unwrap(), 0x0102_0304);
    }

    #[test]
    fn reads_big_endian_fields() {
        let buf = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u16_be(&buf, 2).unwrap(), 0x0304);
        assert_eq!(read_u32_be(&buf, 0).unwrap(), 0x0102_0304);
    }

    #[test]
    fn short_read_reports_missing_bytes() {
        let buf = [0u8; 3];
        assert!(matches!(
            read_u32_le(&buf, 1),
            Err(WireError::InsufficientData { needed: 2 })
        ));
        assert!(matches!(
            read_u8(&buf, 3),
            Err(WireError::InsufficientData { needed: 1 })
        ));
    }

    #[test]
    fn offset_overflow_does_not_panic() {
        let buf = [0u8; 4];
        assert!(read_u32_le(&buf, usize::MAX).is_err());
    }

    #[test]
    fn writers_mirror_readers() {
        let mut buf = [0xFEu8; 8];
        write_u32_le(&mut buf, 0, 0x0102_0304).unwrap();
        write_u16_be(&mut buf, 4, 0xABCD).unwrap();
        write_u8(&mut buf, 6, 0x7F).unwrap();
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01, 0xAB, 0xCD, 0x7F, 0xFE]);
    }

    #[test]
    fn writer_rejects_short_buffer() {
        let mut buf = [0u8; 3];
        assert!(matches!(
            write_u32_be(&mut buf, 0, 1),
            Err(WireError::InsufficientData { needed: 1 })
        ));
        // Nothing was written on failure
        assert_eq!(buf, [0, 0, 0]);
    }

    #[test]
    fn stream_roundtrip() {
        let mut out = Vec::new();
        write_u8_to(&mut out, 0x1F).unwrap();
        write_u16_le_to(&mut out, 0x8B08).unwrap();
        write_u32_le_to(&mut out, 0xDEAD_BEEF).unwrap();

        let mut r = out.as_slice();
        assert_eq!(read_u8_from(&mut r).unwrap(), 0x1F);
        assert_eq!(read_u16_le_from(&mut r).unwrap(), 0x8B08);
        assert_eq!(read_u32_le_from(&mut r).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn stream_eof_mid_field() {
        let mut r: &[u8] = &[0x01, 0x02];
        assert!(matches!(
            read_u32_le_from(&mut r),
            Err(WireError::InsufficientData { needed: 2 })
        ));
    }
}
