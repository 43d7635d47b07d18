//! MPEG-1/2/2.5 audio, layers I-III: frame headers, frames and frame
//! walking. Only framing and metadata; no sample decoding.

pub mod crc;
pub mod enums;
pub mod frame;
pub mod header;
pub mod reader;
pub mod scan;
pub mod tables;

pub use enums::{ChannelMode, ChannelModeExtension, Emphasis, MpegLayer, MpegVersion};
pub use frame::MpegAudioFrame;
pub use header::MpegAudioHeader;
pub use reader::FrameReader;
pub use scan::{FrameScanner, ScannedFrame, StreamSummary};
