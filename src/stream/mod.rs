//! Wire stream decoding
//!
//! Bytes in, [`RawFrame`]s out. Both wire formats are accepted on the same
//! stream; the format is inferred line by line.

pub mod decoder;
pub mod frame;
pub mod legacy;
pub mod standard;

pub use decoder::{decode_line, decode_stream, decode_text, FrameDecoder};
pub use frame::{FrameTag, RawFrame};
pub use standard::{StandardType, DATA_PREFIX, DONE_MARKER};
