use hdrkit_wire::{Shortfall, WireError};

use crate::riff::FourCc;

/// Errors raised while decoding or encoding a format header.
///
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │ FormatError (this crate)                                     │
/// │   ├── InsufficientData   recoverable: append bytes, retry   │
/// │   ├── MalformedHeader    magic / reserved-value violation    │
/// │   ├── ChecksumMismatch   stored CRC disagrees with computed  │
/// │   ├── UnsupportedVariant valid on the wire, not handled      │
/// │   ├── TruncatedContainer nested RIFF size overruns parent    │
/// │   ├── At                 positional context from a walk      │
/// │   └── Wire               anything else from hdrkit-wire      │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// A `WireError::InsufficientData` converts into
/// [`FormatError::InsufficientData`] directly rather than being wrapped, so
/// a shortfall reads the same whichever layer detected it.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("insufficient data: {needed} more byte(s) required")]
    InsufficientData { needed: usize },

    /// Fixed fields violate the format's magic or reserved-value rules.
    /// More bytes will not fix it.
    #[error("malformed {format} header: {reason}")]
    MalformedHeader { format: &'static str, reason: String },

    #[error("{format} checksum mismatch: stored {stored:#06X}, computed {computed:#06X}")]
    ChecksumMismatch {
        format: &'static str,
        stored: u32,
        computed: u32,
    },

    /// A structurally valid field value this crate does not handle,
    /// such as free-format MPEG bitrate or an ID3v2.4 tag.
    #[error("unsupported {field} value {value}")]
    UnsupportedVariant { field: &'static str, value: u32 },

    /// A nested chunk or list declares more bytes than its container (or the
    /// bounded region being parsed) has left.
    #[error(
        "chunk '{tag}' at offset {offset} declares {declared} byte(s), only {available} available"
    )]
    TruncatedContainer {
        tag: FourCc,
        offset: usize,
        declared: u64,
        available: usize,
    },

    /// A child parse failed inside a composite walk.
    #[error("{context} at offset {offset}: {source}")]
    At {
        offset: usize,
        context: &'static str,
        #[source]
        source: Box<FormatError>,
    },

    #[error(transparent)]
    Wire(WireError),
}

impl FormatError {
    pub(crate) fn malformed(format: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            format,
            reason: reason.into(),
        }
    }

    /// Wrap `self` with the offset and structure it was found in.
    #[must_use]
    pub fn at(self, offset: usize, context: &'static str) -> Self {
        Self::At {
            offset,
            context,
            source: Box::new(self),
        }
    }

    /// The innermost error, with every [`At`](Self::At) layer peeled off.
    pub fn root(&self) -> &FormatError {
        match self {
            Self::At { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<WireError> for FormatError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::InsufficientData { needed } => Self::InsufficientData { needed },
            other => Self::Wire(other),
        }
    }
}

impl Shortfall for FormatError {
    fn needed(&self) -> Option<usize> {
        match self {
            Self::InsufficientData { needed } => Some(*needed),
            _ => None,
        }
    }
}
