//! Extraction of whole frames from an arbitrarily chunked byte stream.
//!
//! Frame layout:
//!
//! | offset | size | field          |
//! |--------|------|----------------|
//! | 0      | 1    | frame type     |
//! | 1      | 2    | channel id     |
//! | 3      | 4    | payload size   |
//! | 7      | N    | payload        |
//! | 7 + N  | 1    | `FRAME_END`    |
use bytes::BytesMut;
use tracing::debug;

use super::{Error, RawFrame, FRAME_END, FRAME_HEADER_SIZE};

const DEFAULT_BUFFER_SIZE: usize = 8192;
/// Largest chunk a reader should pass to [`FrameDemultiplexer::feed`] at once.
pub const MAX_CHUNK_SIZE: usize = 8192;
/// Default cap of buffered, not yet extracted, bytes.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Accumulates inbound bytes and yields complete frames in arrival order.
///
/// One chunk may contain several frames, or parts of several frames, so
/// callers must loop on [`next_frame`] until it returns `None`.
///
/// [`next_frame`]: FrameDemultiplexer::next_frame
#[derive(Debug)]
pub struct FrameDemultiplexer {
    buffer: BytesMut,
    max_buffer_size: usize,
    /// negotiated `frame_max`, `None` until tuned or if unlimited
    max_frame_size: Option<usize>,
}

impl Default for FrameDemultiplexer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER_SIZE)
    }
}

impl FrameDemultiplexer {
    pub fn new(max_buffer_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            max_buffer_size,
            max_frame_size: None,
        }
    }

    /// Reject frames larger than `frame_max` from now on. Zero means no limit.
    ///
    /// The buffer cap is raised if needed so that a partial frame of
    /// `frame_max` bytes plus one more chunk always fits.
    pub fn set_frame_max(&mut self, frame_max: u32) {
        self.max_frame_size = match frame_max {
            0 => None,
            max => Some(max as usize),
        };
        if let Some(max) = self.max_frame_size {
            let required = max + MAX_CHUNK_SIZE;
            if self.max_buffer_size < required {
                debug!(
                    "raise read buffer cap from {} to {} for frame_max {}",
                    self.max_buffer_size, required, max
                );
                self.max_buffer_size = required;
            }
        }
    }

    pub fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }

    /// Number of buffered bytes not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Discard any partial data, e.g. after the transport is reset.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Append `chunk` to the tail of the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferOverflow`] and leaves the buffer untouched if the
    /// buffered size would exceed the configured maximum.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), Error> {
        let size = self.buffer.len() + chunk.len();
        if size > self.max_buffer_size {
            return Err(Error::BufferOverflow {
                size,
                max: self.max_buffer_size,
            });
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Remove and return the frame at the head of the buffer if it is complete.
    ///
    /// Returns `Ok(None)` and leaves the buffer untouched when more data is needed.
    ///
    /// # Errors
    ///
    /// - [`Error::FrameTooLarge`] if the declared size exceeds the negotiated `frame_max`.
    /// - [`Error::Corrupted`] if the terminator is not `FRAME_END`.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>, Error> {
        if self.buffer.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let payload_size = u32::from_be_bytes([
            self.buffer[3],
            self.buffer[4],
            self.buffer[5],
            self.buffer[6],
        ]) as usize;
        let frame_size = FRAME_HEADER_SIZE + payload_size + 1;

        if let Some(max) = self.max_frame_size {
            if frame_size > max {
                return Err(Error::FrameTooLarge {
                    size: frame_size,
                    max,
                });
            }
        }
        if self.buffer.len() < frame_size {
            return Ok(None);
        }
        if self.buffer[frame_size - 1] != FRAME_END {
            return Err(Error::Corrupted);
        }

        let frame = self.buffer.split_to(frame_size).freeze();
        Ok(Some(RawFrame::new(frame)))
    }
}
