/// Low-level failures shared by every format in the workspace.
///
/// These errors know nothing about GZIP, RIFF or MPEG. They describe
/// what went wrong while moving bytes: a buffer ended early, a value did
/// not fit its field, or the underlying reader failed.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The buffer ended before the field could be read.
    ///
    /// `needed` is the number of additional bytes beyond what was
    /// available, so a caller reading from a socket knows exactly how
    /// much to top up before retrying.
    #[error("insufficient data: {needed} more byte(s) required")]
    InsufficientData { needed: usize },

    /// A synchsafe integer contained a byte with its high bit set.
    #[error("byte {value:#04X} at offset {offset} is not synchsafe")]
    NotSynchsafe { offset: usize, value: u8 },

    /// A value does not fit the width of the field it is written to.
    #[error("{what} value {value} exceeds maximum {max}")]
    ValueOutOfRange {
        what: &'static str,
        value: u64,
        max: u64,
    },

    /// I/O error while reading from or writing to a stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Build an [`InsufficientData`](Self::InsufficientData) error for a
    /// read of `width` bytes at `offset` in a buffer of length `available`.
    pub(crate) fn short(offset: usize, width: usize, available: usize) -> Self {
        Self::InsufficientData {
            needed: offset.saturating_add(width).saturating_sub(available),
        }
    }
}
