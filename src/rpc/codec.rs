//! Length-prefix frame codec.
//!
//! Wire format:
//! ```text
//! ┌────────────┬──────────────────────────┐
//! │ Length (4B)│ JSON payload (N B)       │
//! │ LE u32     │                          │
//! └────────────┴──────────────────────────┘
//! ```
//!
//! The decoder accumulates incoming bytes and yields complete frames one
//! at a time.  A single `Transport::read` may return part of a header,
//! part of a payload, or several frames back to back; [`FrameDecoder::next_frame`]
//! is called until it returns `Ok(None)`.
//!
//! A zero or oversized length cannot be resynchronised from, so it is an
//! error and the connection should be dropped.

/// Maximum frame payload size (protects against memory exhaustion).
pub const MAX_FRAME_SIZE: usize = 4096;

/// Frame header size (4-byte little-endian length).
pub const HEADER_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Header announced an empty payload.
    Empty,
    /// Header (or an outgoing payload) exceeds [`MAX_FRAME_SIZE`].
    TooLarge(usize),
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "zero-length frame"),
            Self::TooLarge(n) => write!(f, "frame of {} bytes exceeds {}", n, MAX_FRAME_SIZE),
        }
    }
}

impl std::error::Error for FrameError {}

/// Streaming frame decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(HEADER_SIZE + 256),
        }
    }

    /// Append bytes read from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop the next complete payload, if one is buffered.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let Some(header) = self.buf.first_chunk::<HEADER_SIZE>() else {
            return Ok(None);
        };
        let expected = u32::from_le_bytes(*header) as usize;
        if expected == 0 {
            return Err(FrameError::Empty);
        }
        if expected > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge(expected));
        }
        if self.buf.len() < HEADER_SIZE + expected {
            return Ok(None);
        }
        let payload = self.buf[HEADER_SIZE..HEADER_SIZE + expected].to_vec();
        self.buf.drain(..HEADER_SIZE + expected);
        Ok(Some(payload))
    }

    /// Bytes buffered but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial frame (e.g. after a protocol error).
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

/// Encode a payload into a length-prefixed frame.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.is_empty() {
        return Err(FrameError::Empty);
    }
    if payload.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge(payload.len()));
    }
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}
