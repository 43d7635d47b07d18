#![warn(clippy::pedantic)]

pub mod avi;
pub mod config;
pub mod detect;
pub mod error;
pub mod gzip;
pub mod id3;
pub mod mpeg;
pub mod pdf;
pub mod riff;

pub use avi::{AviFlags, AviHeaderList, AviMainHeader, HdrlEntry, StreamHeaderList};
pub use config::{GzipLimits, ScanConfig};
pub use detect::{Format, sniff};
pub use error::FormatError;
pub use gzip::{GzipFlags, GzipHeader, GzipTrailer, OperatingSystem};
pub use id3::{Id3Frame, Id3FrameHeader, Id3v2Flags, Id3v2Header, Id3v2Tag};
pub use mpeg::{FrameReader, FrameScanner, MpegAudioFrame, MpegAudioHeader};
pub use pdf::PdfHeader;
pub use riff::{ChunkHeader, FourCc, ListHeader, RawChunk, RiffFormHeader};

pub use hdrkit_wire::{ByteWindow, HeaderCodec, ParseStatus};

/// Outcome of parsing one of this crate's formats.
pub type Parse<T> = ParseStatus<T, FormatError>;
