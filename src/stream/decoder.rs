//! Frame decoder
//!
//! Line buffering across read boundaries plus per-line format detection.
//!
//! # FrameDecoder
//!
//! Synchronous state machine: feed it byte batches with [`FrameDecoder::push`]
//! and call [`FrameDecoder::finish`] once the source ends. The carry-over is
//! kept as raw bytes, so a multi-byte character split across two reads is
//! only decoded once its line is complete.
//!
//! # decode_stream
//!
//! Async adapter over a transport byte stream. A source failure yields one
//! `error` frame and then the failure itself, after which the stream ends.

use futures::stream::{BoxStream, Stream, StreamExt};
use tracing::{error, warn};

use bytes::Bytes;

use super::frame::RawFrame;
use super::legacy::parse_legacy_line;
use super::standard::{parse_standard_data, DATA_PREFIX};
use crate::transport::TransportError;

/// Incremental line decoder
#[derive(Debug, Default)]
pub struct FrameDecoder {
    carry: Vec<u8>,
}

impl FrameDecoder {
    /// Create decoder with an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one batch of bytes, returning every frame it completes
    pub fn push(&mut self, bytes: &[u8]) -> Vec<RawFrame> {
        self.carry.extend_from_slice(bytes);

        let Some(last_newline) = self.carry.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.carry.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.carry, rest);

        complete
            .split(|b| *b == b'\n')
            .filter_map(|line| decode_line(&String::from_utf8_lossy(line)))
            .collect()
    }

    /// Flush the carry-over as a final line
    pub fn finish(&mut self) -> Vec<RawFrame> {
        if self.carry.is_empty() {
            return Vec::new();
        }
        let last = std::mem::take(&mut self.carry);
        decode_line(&String::from_utf8_lossy(&last))
            .into_iter()
            .collect()
    }

    /// Bytes buffered waiting for a line terminator
    pub fn pending_bytes(&self) -> usize {
        self.carry.len()
    }
}

/// Decode one line in either format
///
/// Returns `None` for blank lines and for standard events that carry
/// nothing (`[DONE]`, boundary markers, unrecognized types).
pub fn decode_line(line: &str) -> Option<RawFrame> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return None;
    }

    let frame = match line.strip_prefix(DATA_PREFIX) {
        Some(data) => parse_standard_data(data, line),
        None => parse_legacy_line(line),
    };

    if let Some(f) = frame.as_ref().filter(|f| f.is_error()) {
        if f.payload.get("raw").is_some() {
            warn!(line = %line, "frame decode error");
        }
    }

    frame
}

/// Decode a whole text body in one go
pub fn decode_text(body: &str) -> Vec<RawFrame> {
    let mut decoder = FrameDecoder::new();
    let mut frames = decoder.push(body.as_bytes());
    frames.extend(decoder.finish());
    frames
}

/// Lazily decode frames from a byte stream
pub fn decode_stream<S>(source: S) -> BoxStream<'static, Result<RawFrame, TransportError>>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
{
    async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        futures::pin_mut!(source);

        while let Some(chunk) = source.next().await {
            match chunk {
                Ok(bytes) => {
                    for frame in decoder.push(&bytes) {
                        yield Ok(frame);
                    }
                }
                Err(err) => {
                    error!(error = %err, pending = decoder.pending_bytes(), "byte source failed");
                    yield Ok(RawFrame::transport_error(&err));
                    yield Err(err);
                    return;
                }
            }
        }

        for frame in decoder.finish() {
            yield Ok(frame);
        }
    }
    .boxed()
}
