use crate::error::WireError;
use crate::window::ByteWindow;

/// Outcome of one incremental parse attempt.
///
/// ```text
/// ┌──────────────┬───────────────────────────────────────────────┐
/// │ Complete     │ header decoded, `consumed` bytes used          │
/// │ NeedMore(n)  │ append at least `n` bytes and call again       │
/// │ Invalid(e)   │ terminal for this window, more bytes won't help│
/// └──────────────┴───────────────────────────────────────────────┘
/// ```
///
/// `NeedMore` is never an error. A caller reading from a socket tops up
/// its buffer by the reported amount and retries from the same start
/// offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseStatus<T, E> {
    Complete { value: T, consumed: usize },
    NeedMore(usize),
    Invalid(E),
}

impl<T, E> ParseStatus<T, E> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn is_need_more(&self) -> bool {
        matches!(self, Self::NeedMore(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// The decoded value and byte count, if the parse completed.
    pub fn complete(self) -> Option<(T, usize)> {
        match self {
            Self::Complete { value, consumed } => Some((value, consumed)),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParseStatus<U, E> {
        match self {
            Self::Complete { value, consumed } => ParseStatus::Complete {
                value: f(value),
                consumed,
            },
            Self::NeedMore(n) => ParseStatus::NeedMore(n),
            Self::Invalid(e) => ParseStatus::Invalid(e),
        }
    }

    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> ParseStatus<T, F> {
        match self {
            Self::Complete { value, consumed } => ParseStatus::Complete { value, consumed },
            Self::NeedMore(n) => ParseStatus::NeedMore(n),
            Self::Invalid(e) => ParseStatus::Invalid(f(e)),
        }
    }

    /// Collapse into a `Result` for callers that hold the whole input.
    ///
    /// `NeedMore(n)` becomes an [`WireError::InsufficientData`] converted
    /// into the format's error type.
    ///
    /// # Errors
    ///
    /// The `Invalid` error, or the converted shortfall.
    pub fn into_result(self) -> Result<(T, usize), E>
    where
        E: From<WireError>,
    {
        match self {
            Self::Complete { value, consumed } => Ok((value, consumed)),
            Self::NeedMore(needed) => Err(WireError::InsufficientData { needed }.into()),
            Self::Invalid(e) => Err(e),
        }
    }
}

/// Errors that can report a byte shortfall.
///
/// Lets a parser written against `Result` (with `?` on the primitive
/// readers) be turned back into a [`ParseStatus`] at its public boundary.
pub trait Shortfall {
    /// `Some(n)` if this error only means "`n` more bytes are needed".
    fn needed(&self) -> Option<usize>;
}

impl Shortfall for WireError {
    fn needed(&self) -> Option<usize> {
        match self {
            Self::InsufficientData { needed } => Some(*needed),
            _ => None,
        }
    }
}

impl<T, E: Shortfall> From<Result<(T, usize), E>> for ParseStatus<T, E> {
    fn from(result: Result<(T, usize), E>) -> Self {
        match result {
            Ok((value, consumed)) => Self::Complete { value, consumed },
            Err(e) => match e.needed() {
                Some(n) => Self::NeedMore(n),
                None => Self::Invalid(e),
            },
        }
    }
}

/// A fixed-layout binary header with an incremental decoder and an encoder.
///
/// Every format in the workspace implements this trait, so generic code
/// (the frame reader, the fuzz targets, the round-trip tests) can drive
/// any of them the same way.
pub trait HeaderCodec: Sized {
    type Error: From<WireError>;

    /// Try to decode a header from the start of `buf`.
    fn parse(buf: &[u8]) -> ParseStatus<Self, Self::Error>;

    /// Append the encoded header to `out`, returning the bytes written.
    ///
    /// # Errors
    ///
    /// If the header holds a value its wire field cannot represent.
    fn write_to(&self, out: &mut Vec<u8>) -> Result<usize, Self::Error>;

    /// Decode from a borrowed window instead of a slice.
    fn parse_window(window: ByteWindow<'_>) -> ParseStatus<Self, Self::Error> {
        Self::parse(window.as_slice())
    }

    /// Encode into a fresh buffer.
    ///
    /// # Errors
    ///
    /// See [`write_to`](Self::write_to).
    fn encode(&self) -> Result<Vec<u8>, Self::Error> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}
