#![warn(clippy::pedantic)]

pub mod binary_io;
pub mod bits;
pub mod crc;
pub mod error;
pub mod parse;
pub mod synchsafe;
pub mod window;

pub use error::WireError;
pub use bits::BitReader;
pub use crc::Crc16;
pub use parse::{HeaderCodec, ParseStatus, Shortfall};
pub use window::ByteWindow;
