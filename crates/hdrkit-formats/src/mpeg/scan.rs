use std::time::Duration;

use hdrkit_wire::{HeaderCodec, ParseStatus};
use tracing::{debug, trace};

use super::frame::MpegAudioFrame;
use super::header::MpegAudioHeader;
use crate::config::ScanConfig;
use crate::error::FormatError;
use crate::id3::{Id3v2Header, MAGIC as ID3_MAGIC};

/// A frame found by [`FrameScanner`], with its position in the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannedFrame {
    pub offset: usize,
    pub frame: MpegAudioFrame,
}

/// Iterates the MPEG audio frames of an in-memory stream.
///
/// The walk, per step:
///
/// ```text
///   try frame at pos ──Complete──► yield, pos += frame length
///        │
///        ├─ Invalid ─► pos += 1 (resync), give up past max_resync_bytes
///        └─ NeedMore ─► end of input: a cut-off frame is an error,
///                       a cut-off header is trailing junk
/// ```
///
/// A leading ID3v2 tag is skipped first when the config asks for it.
/// Free-format frames cannot be delimited and are treated as junk.
pub struct FrameScanner<'a> {
    buf: &'a [u8],
    pos: usize,
    config: ScanConfig,
    frames: usize,
    skipped: usize,
    tag_len: usize,
    done: bool,
}

impl<'a> FrameScanner<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_config(buf, ScanConfig::default())
    }

    pub fn with_config(buf: &'a [u8], config: ScanConfig) -> Self {
        let mut tag_len = 0;
        if config.skip_id3v2 && buf.starts_with(ID3_MAGIC) {
            match Id3v2Header::parse(buf) {
                ParseStatus::Complete { value, .. } => {
                    tag_len = value.total_size().min(buf.len());
                    debug!(tag_len, "skipping id3v2 tag");
                }
                other => {
                    let status = other.map(|_| ());
                    debug!(?status, "leading ID3 bytes are not a usable tag");
                }
            }
        }
        Self {
            buf,
            pos: tag_len,
            config,
            frames: 0,
            skipped: 0,
            tag_len,
            done: false,
        }
    }

    /// Length of the ID3v2 tag skipped at the start, 0 if none.
    pub fn id3v2_len(&self) -> usize {
        self.tag_len
    }

    /// Bytes discarded while resynchronising so far.
    pub fn skipped_bytes(&self) -> usize {
        self.skipped
    }

    /// Current offset into the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn fail(&mut self, err: FormatError) -> Option<Result<ScannedFrame, FormatError>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for FrameScanner<'_> {
    type Item = Result<ScannedFrame, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.config.max_frames.is_some_and(|max| self.frames >= max) {
            self.done = true;
            return None;
        }

        let mut run = 0usize;
        while self.pos < self.buf.len() {
            let offset = self.pos;
            match MpegAudioFrame::parse(&self.buf[offset..]) {
                ParseStatus::Complete { value, consumed } => {
                    if run > 0 {
                        debug!(skipped = run, offset, "resynchronised on frame sync");
                    }
                    if self.config.verify_crc {
                        if let Err(e) = value.verify_crc() {
                            return self.fail(e.at(offset, "mpeg audio frame"));
                        }
                    }
                    trace!(offset, len = consumed, "mpeg audio frame");
                    self.pos += consumed;
                    self.frames += 1;
                    return Some(Ok(ScannedFrame {
                        offset,
                        frame: value,
                    }));
                }
                ParseStatus::NeedMore(needed) => {
                    if self.buf.len() - offset >= MpegAudioHeader::LEN {
                        let err = FormatError::InsufficientData { needed };
                        return self.fail(err.at(offset, "mpeg audio frame"));
                    }
                    // Fewer bytes than a header: nothing more can start here.
                    self.skipped += self.buf.len() - offset;
                    self.pos = self.buf.len();
                    break;
                }
                ParseStatus::Invalid(_) => {
                    self.pos += 1;
                    self.skipped += 1;
                    run += 1;
                    if self.config.max_resync_bytes.is_some_and(|max| run > max) {
                        return self.fail(no_sync(run).at(offset + 1 - run, "mpeg audio stream"));
                    }
                }
            }
        }

        if run > 0 {
            debug!(skipped = run, "trailing bytes after last frame");
        }
        self.done = true;
        None
    }
}

pub(super) fn no_sync(run: usize) -> FormatError {
    FormatError::malformed("mpeg audio", format!("no frame sync within {run} bytes"))
}

/// Totals over a scanned stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames: usize,
    pub audio_bytes: usize,
    pub duration: Duration,
}

impl StreamSummary {
    pub fn add(&mut self, frame: &MpegAudioFrame) {
        self.frames += 1;
        self.audio_bytes += frame.audio.len();
        self.duration += frame.header.duration();
    }
}
