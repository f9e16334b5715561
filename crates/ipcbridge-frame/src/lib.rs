//! Length-prefixed, sequence-numbered envelope framing.
//!
//! Every message travels as one frame:
//! - a 4-byte big-endian length of everything after the length field
//! - an 8-byte big-endian signed sequence number
//! - the envelope: a 1-byte message tag followed by the payload bytes
//!
//! [`FrameWriter`] numbers outgoing frames; [`FrameReader`] reassembles frames
//! from partial arrivals and reports (without enforcing) sequence gaps.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, FrameDecoder, DEFAULT_MAX_FRAME_SIZE,
    LENGTH_FIELD_SIZE, MIN_FRAME_BODY, SEQUENCE_SIZE,
};
pub use envelope::{Envelope, INVALID_TAG};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
