use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};

use crate::envelope::Envelope;
use crate::error::{FrameError, Result};

/// Length field: 4 bytes, big-endian.
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Sequence number: 8 bytes, big-endian, signed.
pub const SEQUENCE_SIZE: usize = 8;

/// Smallest legal frame body: sequence number plus tag byte.
pub const MIN_FRAME_BODY: usize = SEQUENCE_SIZE + 1;

/// Default maximum frame body size: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// A decoded frame: the writer's sequence number and the envelope it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence: i64,
    pub envelope: Envelope,
}

impl Frame {
    /// Value of the length field for this frame.
    pub fn body_len(&self) -> usize {
        SEQUENCE_SIZE + self.envelope.wire_size()
    }

    /// Total wire size of this frame (length field + body).
    pub fn wire_size(&self) -> usize {
        LENGTH_FIELD_SIZE + self.body_len()
    }
}

/// Append one frame to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────────┬────────────────┬──────────┬─────────────────────┐
/// │ Length (4B)  │ Sequence (8B)  │ Tag (1B) │ Payload             │
/// │ u32 BE       │ i64 BE         │          │ (Length - 9 bytes)  │
/// └──────────────┴────────────────┴──────────┴─────────────────────┘
/// ```
///
/// A zero placeholder is written for the length first and patched with the
/// exact number of bytes that followed it. Returns that number.
pub fn encode_frame(
    sequence: i64,
    envelope: &Envelope,
    max_frame_size: usize,
    dst: &mut BytesMut,
) -> Result<usize> {
    let body_len = SEQUENCE_SIZE + envelope.wire_size();
    let max = max_frame_size.min(u32::MAX as usize);
    if body_len > max {
        return Err(FrameError::FrameTooLarge {
            size: body_len,
            max,
        });
    }

    dst.reserve(LENGTH_FIELD_SIZE + body_len);
    let start = dst.len();
    dst.put_u32(0);
    dst.put_i64(sequence);
    dst.put_u8(envelope.tag());
    dst.put_slice(envelope.payload());

    let written = dst.len() - start - LENGTH_FIELD_SIZE;
    dst[start..start + LENGTH_FIELD_SIZE].copy_from_slice(&(written as u32).to_be_bytes());
    Ok(written)
}

/// Incremental frame decoder.
///
/// Once a length field has been consumed it is remembered until the whole
/// body has arrived, so a partially received frame is never re-parsed.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    pending_len: Option<usize>,
    max_frame_size: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            pending_len: None,
            max_frame_size,
        }
    }

    /// Decode the next frame from `src`.
    ///
    /// Returns `Ok(None)` when `src` does not yet hold a complete frame.
    /// Consumed bytes are removed from `src`.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let body_len = match self.pending_len {
            Some(len) => len,
            None => {
                if src.len() < LENGTH_FIELD_SIZE {
                    return Ok(None);
                }
                let len = src.get_u32() as usize;
                if len < MIN_FRAME_BODY {
                    return Err(FrameError::FrameTooShort {
                        len,
                        min: MIN_FRAME_BODY,
                    });
                }
                if len > self.max_frame_size {
                    return Err(FrameError::FrameTooLarge {
                        size: len,
                        max: self.max_frame_size,
                    });
                }
                self.pending_len = Some(len);
                len
            }
        };

        if src.len() < body_len {
            return Ok(None);
        }
        self.pending_len = None;

        let mut body = src.split_to(body_len);
        let sequence = body.get_i64();
        let tag = body.get_u8();
        Ok(Some(Frame {
            sequence,
            envelope: Envelope::new(tag, body.freeze()),
        }))
    }

    /// Body length read from the wire whose bytes have not all arrived yet.
    pub fn pending_len(&self) -> Option<usize> {
        self.pending_len
    }

    /// Forget any half-read frame.
    pub fn reset(&mut self) {
        self.pending_len = None;
    }

    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.max_frame_size = max_frame_size;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

/// Decode one complete frame from a buffer with a fresh decoder.
///
/// Only useful when `src` is known to start at a frame boundary; streaming
/// callers keep a [`FrameDecoder`] instead.
pub fn decode_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Frame>> {
    if src.len() < LENGTH_FIELD_SIZE {
        return Ok(None);
    }
    let announced = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if announced >= MIN_FRAME_BODY
        && announced <= max_frame_size
        && src.len() < LENGTH_FIELD_SIZE + announced
    {
        return Ok(None);
    }
    FrameDecoder::new(max_frame_size).decode(src)
}

/// Configuration shared by [`FrameReader`](crate::FrameReader) and
/// [`FrameWriter`](crate::FrameWriter).
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum frame body size in bytes. Default: 16 MiB.
    pub max_frame_size: usize,
    /// How long a write may keep hitting a full transport before it is
    /// abandoned. `None` waits forever.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            write_timeout: Some(Duration::from_secs(5)),
        }
    }
}
