use std::fmt;

use bytes::Bytes;

/// Tag value reserved for "no message".
pub const INVALID_TAG: u8 = 0;

const DEBUG_PREVIEW_LIMIT: usize = 96;

/// One message on the wire: a type tag plus the serialized payload.
///
/// The envelope owns its payload and never interprets it; typed decoding
/// happens once, at the boundary, in the message registry. Two envelopes are
/// equal when both tag and payload bytes are equal.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Envelope {
    tag: u8,
    payload: Bytes,
}

impl Envelope {
    /// Create an envelope from a tag and payload bytes.
    pub fn new(tag: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }

    /// The tag identifying the payload's message type.
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// The serialized payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// True unless the tag is [`INVALID_TAG`].
    pub fn is_valid(&self) -> bool {
        self.tag != INVALID_TAG
    }

    /// Bytes this envelope occupies inside a frame (tag + payload).
    pub fn wire_size(&self) -> usize {
        1 + self.payload.len()
    }

    /// Split into tag and payload.
    pub fn into_parts(self) -> (u8, Bytes) {
        (self.tag, self.payload)
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("tag", &self.tag)
            .field("size", &self.payload.len())
            .field("payload", &PayloadPreview(&self.payload))
            .finish()
    }
}

struct PayloadPreview<'a>(&'a [u8]);

impl fmt::Debug for PayloadPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.0[..self.0.len().min(DEBUG_PREVIEW_LIMIT)];
        let ellipsis = if shown.len() < self.0.len() { "..." } else { "" };
        match std::str::from_utf8(shown) {
            Ok(text) => write!(f, "{text:?}{ellipsis}"),
            Err(_) => {
                for byte in shown {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, "{ellipsis}")
            }
        }
    }
}
