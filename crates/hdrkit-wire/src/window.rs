use crate::error::WireError;

/// A borrowed `(buffer, offset, length)` view.
///
/// Parsers never own the bytes they inspect. A `ByteWindow` lets a caller
/// that keeps one large receive buffer hand a parser just the region it
/// has filled so far, without copying. The window is validated once, on
/// construction, so `as_slice` can never panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteWindow<'a> {
    buf: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> ByteWindow<'a> {
    /// Create a window of `len` bytes starting at `offset` in `buf`.
    ///
    /// # Errors
    ///
    /// [`WireError::InsufficientData`] if `offset + len` runs past the end
    /// of `buf`.
    pub fn new(buf: &'a [u8], offset: usize, len: usize) -> Result<Self, WireError> {
        match offset.checked_add(len) {
            Some(end) if end <= buf.len() => Ok(Self { buf, offset, len }),
            _ => Err(WireError::short(offset, len, buf.len())),
        }
    }

    /// The bytes covered by this window.
    pub fn as_slice(&self) -> &'a [u8] {
        &self.buf[self.offset..self.offset + self.len]
    }

    /// Offset of the window within its underlying buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A narrower window, `start` bytes into this one.
    ///
    /// # Errors
    ///
    /// [`WireError::InsufficientData`] if the sub-window does not fit.
    pub fn sub_window(&self, start: usize, len: usize) -> Result<Self, WireError> {
        let inner = Self::new(self.as_slice(), start, len)?;
        Ok(Self {
            buf: self.buf,
            offset: self.offset + inner.offset,
            len: inner.len,
        })
    }
}

impl<'a> From<&'a [u8]> for ByteWindow<'a> {
    fn from(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            len: buf.len(),
        }
    }
}
