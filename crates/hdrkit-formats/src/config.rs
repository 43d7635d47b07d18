/// Default upper bound on resynchronisation and on GZIP string fields.
pub const DEFAULT_LIMIT: usize = 64 * 1024;

/// Limits applied while parsing a GZIP member header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GzipLimits {
    /// Longest FNAME or FCOMMENT accepted, terminator excluded.
    ///
    /// Exceeding it is `MalformedHeader`, so an unterminated string in a
    /// hostile stream cannot keep the incremental parser asking for more.
    pub max_field_len: usize,
}

impl Default for GzipLimits {
    fn default() -> Self {
        Self {
            max_field_len: DEFAULT_LIMIT,
        }
    }
}

/// How [`FrameScanner`](crate::mpeg::FrameScanner) walks an MPEG audio
/// stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    /// Skip a leading ID3v2 tag before looking for the first frame.
    pub skip_id3v2: bool,
    /// Check the CRC-16 of protected frames; a mismatch stops the scan.
    pub verify_crc: bool,
    /// Give up after this many consecutive bytes without a valid frame.
    /// `None` scans to the end.
    pub max_resync_bytes: Option<usize>,
    /// Stop after this many frames.
    pub max_frames: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_id3v2: true,
            verify_crc: false,
            max_resync_bytes: Some(DEFAULT_LIMIT),
            max_frames: None,
        }
    }
}
