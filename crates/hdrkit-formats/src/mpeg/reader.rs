use std::io::{self, Read};

use hdrkit_wire::{HeaderCodec, ParseStatus, WireError};
use tracing::{debug, trace};

use super::frame::MpegAudioFrame;
use super::header::MpegAudioHeader;
use super::scan::{ScannedFrame, no_sync};
use crate::config::ScanConfig;
use crate::error::FormatError;
use crate::id3::{Id3v2Header, MAGIC as ID3_MAGIC};

/// Smallest read issued against the underlying reader.
const READ_CHUNK: usize = 4096;

/// Blocking frame reader over any [`Read`] source.
///
/// Drives [`MpegAudioFrame::parse`] the way a network client would: on
/// `NeedMore(n)` it reads at least `n` more bytes and retries from the
/// same start, so a frame is never re-scanned from scratch. Only the
/// bytes of the frame being assembled are buffered.
///
/// ```text
///   SkipTag ──► ReadFrames ──► Done
/// ```
///
/// Applies the same [`ScanConfig`] as
/// [`FrameScanner`](super::FrameScanner) and yields the same frames for
/// the same bytes.
pub struct FrameReader<R> {
    reader: R,
    state: ReaderState,
    config: ScanConfig,
    /// Bytes read but not yet consumed.
    buf: Vec<u8>,
    /// Stream offset of `buf[0]`.
    offset: usize,
    frames: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReaderState {
    SkipTag,
    ReadFrames,
    Done,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, ScanConfig::default())
    }

    pub fn with_config(reader: R, config: ScanConfig) -> Self {
        let state = if config.skip_id3v2 {
            ReaderState::SkipTag
        } else {
            ReaderState::ReadFrames
        };
        Self {
            reader,
            state,
            config,
            buf: Vec::with_capacity(READ_CHUNK),
            offset: 0,
            frames: 0,
        }
    }

    /// Stream offset of the next unconsumed byte.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Give back the underlying reader. Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next frame. `None` at the end of the stream.
    pub fn next_frame(&mut self) -> Option<Result<ScannedFrame, FormatError>> {
        if self.state == ReaderState::SkipTag {
            if let Err(e) = self.skip_tag() {
                return self.fail(e);
            }
            self.state = ReaderState::ReadFrames;
        }
        match self.state {
            ReaderState::ReadFrames => self.read_frame(),
            ReaderState::SkipTag | ReaderState::Done => None,
        }
    }

    fn fail(&mut self, err: FormatError) -> Option<Result<ScannedFrame, FormatError>> {
        self.state = ReaderState::Done;
        Some(Err(err))
    }

    /// Append at least `at_least` bytes to the buffer unless the source
    /// ends first. Returns how many were appended; 0 means end of stream.
    fn fill(&mut self, at_least: usize) -> Result<usize, FormatError> {
        let start = self.buf.len();
        let target = start + at_least;
        let mut chunk = vec![0u8; at_least.max(READ_CHUNK)];
        while self.buf.len() < target {
            let n = match self.reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(WireError::Io(e).into()),
            };
            self.buf.extend_from_slice(&chunk[..n]);
        }
        let read = self.buf.len() - start;
        if read > 0 {
            trace!(read, buffered = self.buf.len(), "topped up frame buffer");
        }
        Ok(read)
    }

    fn consume(&mut self, n: usize) {
        self.buf.drain(..n);
        self.offset += n;
    }

    fn skip_tag(&mut self) -> Result<(), FormatError> {
        if self.buf.len() < Id3v2Header::LEN {
            self.fill(Id3v2Header::LEN - self.buf.len())?;
        }
        if !self.buf.starts_with(ID3_MAGIC) {
            return Ok(());
        }
        let ParseStatus::Complete { value: header, .. } = Id3v2Header::parse(&self.buf) else {
            debug!("leading ID3 bytes are not a usable tag");
            return Ok(());
        };

        let total = header.total_size();
        let buffered = self.buf.len().min(total);
        self.consume(buffered);
        let rest = (total - buffered) as u64;
        let skipped = io::copy(&mut (&mut self.reader).take(rest), &mut io::sink())
            .map_err(WireError::Io)?;
        self.offset += usize::try_from(skipped).unwrap_or(usize::MAX);
        if skipped < rest {
            let needed = usize::try_from(rest - skipped).unwrap_or(usize::MAX);
            return Err(FormatError::InsufficientData { needed }.at(0, "id3v2 tag"));
        }
        debug!(tag_len = total, "skipped id3v2 tag");
        Ok(())
    }

    fn read_frame(&mut self) -> Option<Result<ScannedFrame, FormatError>> {
        if self.config.max_frames.is_some_and(|max| self.frames >= max) {
            self.state = ReaderState::Done;
            return None;
        }

        let mut run = 0usize;
        loop {
            match MpegAudioFrame::parse(&self.buf) {
                ParseStatus::Complete { value, consumed } => {
                    let offset = self.offset;
                    if run > 0 {
                        debug!(skipped = run, offset, "resynchronised on frame sync");
                    }
                    if self.config.verify_crc {
                        if let Err(e) = value.verify_crc() {
                            return self.fail(e.at(offset, "mpeg audio frame"));
                        }
                    }
                    self.consume(consumed);
                    self.frames += 1;
                    return Some(Ok(ScannedFrame {
                        offset,
                        frame: value,
                    }));
                }
                ParseStatus::NeedMore(needed) => match self.fill(needed) {
                    Ok(0) => {
                        if self.buf.len() >= MpegAudioHeader::LEN {
                            let offset = self.offset;
                            let err = FormatError::InsufficientData { needed };
                            return self.fail(err.at(offset, "mpeg audio frame"));
                        }
                        if run > 0 || !self.buf.is_empty() {
                            let skipped = run + self.buf.len();
                            debug!(skipped, "trailing bytes after last frame");
                        }
                        self.state = ReaderState::Done;
                        return None;
                    }
                    Ok(_) => {}
                    Err(e) => return self.fail(e),
                },
                ParseStatus::Invalid(_) => {
                    self.consume(1);
                    run += 1;
                    if self.config.max_resync_bytes.is_some_and(|max| run > max) {
                        let offset = self.offset - run;
                        return self.fail(no_sync(run).at(offset, "mpeg audio stream"));
                    }
                }
            }
        }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<ScannedFrame, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}
