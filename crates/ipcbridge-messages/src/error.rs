use crate::tag::MessageTag;

/// Errors that can occur while encoding or decoding typed messages.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The payload could not be serialized or did not match the message layout.
    #[error("payload encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// The tag byte is not part of the registry.
    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    /// The envelope carries the reserved invalid tag.
    #[error("envelope has the invalid tag")]
    InvalidTag,

    /// The tag is registered but belongs to the opposite direction.
    #[error("unexpected message {} ({}) for this side", .0.name(), .0.value())]
    UnexpectedTag(MessageTag),

    /// A typed decode was requested for a different message than the envelope holds.
    #[error("expected {} message, envelope holds tag {actual}", .expected.name())]
    TagMismatch { expected: MessageTag, actual: u8 },
}

pub type Result<T> = std::result::Result<T, MessageError>;
