use std::fmt;

use crate::error::MessageError;

/// Which end of the connection handles a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Editor to backend: handled by a [`CodeModelServer`](crate::CodeModelServer).
    ToServer,
    /// Backend to editor: handled by a [`CodeModelClient`](crate::CodeModelClient).
    ToClient,
}

/// Closed registry of message tags.
///
/// The numeric values are the wire tag bytes and never change. Tag 0 is
/// reserved and never assigned to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessageTag {
    Invalid = 0,
    End = 1,
    RegisterTranslationUnitsForEditor = 2,
    UpdateTranslationUnitsForEditor = 3,
    UnregisterTranslationUnitsForEditor = 4,
    RegisterProjectPartsForEditor = 5,
    UnregisterProjectPartsForEditor = 6,
    RegisterUnsavedFilesForEditor = 7,
    UnregisterUnsavedFilesForEditor = 8,
    CompleteCode = 9,
    RequestDocumentAnnotations = 10,
    RequestReferences = 11,
    RequestFollowSymbol = 12,
    RequestToolTip = 13,
    UpdateVisibleTranslationUnits = 14,
    Alive = 15,
    Echo = 16,
    CodeCompleted = 17,
    DocumentAnnotationsChanged = 18,
    References = 19,
    FollowSymbol = 20,
    ToolTip = 21,
    TranslationUnitDoesNotExist = 22,
    ProjectPartsDoNotExist = 23,
}

impl MessageTag {
    /// Every registered tag, `Invalid` excluded, in wire order.
    pub const ALL: [MessageTag; 23] = [
        MessageTag::End,
        MessageTag::RegisterTranslationUnitsForEditor,
        MessageTag::UpdateTranslationUnitsForEditor,
        MessageTag::UnregisterTranslationUnitsForEditor,
        MessageTag::RegisterProjectPartsForEditor,
        MessageTag::UnregisterProjectPartsForEditor,
        MessageTag::RegisterUnsavedFilesForEditor,
        MessageTag::UnregisterUnsavedFilesForEditor,
        MessageTag::CompleteCode,
        MessageTag::RequestDocumentAnnotations,
        MessageTag::RequestReferences,
        MessageTag::RequestFollowSymbol,
        MessageTag::RequestToolTip,
        MessageTag::UpdateVisibleTranslationUnits,
        MessageTag::Alive,
        MessageTag::Echo,
        MessageTag::CodeCompleted,
        MessageTag::DocumentAnnotationsChanged,
        MessageTag::References,
        MessageTag::FollowSymbol,
        MessageTag::ToolTip,
        MessageTag::TranslationUnitDoesNotExist,
        MessageTag::ProjectPartsDoNotExist,
    ];

    /// The wire byte for this tag.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Which side handles messages with this tag. `None` for `Invalid`.
    pub fn direction(self) -> Option<Direction> {
        match self {
            MessageTag::Invalid => None,
            MessageTag::End
            | MessageTag::RegisterTranslationUnitsForEditor
            | MessageTag::UpdateTranslationUnitsForEditor
            | MessageTag::UnregisterTranslationUnitsForEditor
            | MessageTag::RegisterProjectPartsForEditor
            | MessageTag::UnregisterProjectPartsForEditor
            | MessageTag::RegisterUnsavedFilesForEditor
            | MessageTag::UnregisterUnsavedFilesForEditor
            | MessageTag::CompleteCode
            | MessageTag::RequestDocumentAnnotations
            | MessageTag::RequestReferences
            | MessageTag::RequestFollowSymbol
            | MessageTag::RequestToolTip
            | MessageTag::UpdateVisibleTranslationUnits => Some(Direction::ToServer),
            MessageTag::Alive
            | MessageTag::Echo
            | MessageTag::CodeCompleted
            | MessageTag::DocumentAnnotationsChanged
            | MessageTag::References
            | MessageTag::FollowSymbol
            | MessageTag::ToolTip
            | MessageTag::TranslationUnitDoesNotExist
            | MessageTag::ProjectPartsDoNotExist => Some(Direction::ToClient),
        }
    }

    /// Human-readable message name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            MessageTag::Invalid => "Invalid",
            MessageTag::End => "End",
            MessageTag::RegisterTranslationUnitsForEditor => "RegisterTranslationUnitsForEditor",
            MessageTag::UpdateTranslationUnitsForEditor => "UpdateTranslationUnitsForEditor",
            MessageTag::UnregisterTranslationUnitsForEditor => {
                "UnregisterTranslationUnitsForEditor"
            }
            MessageTag::RegisterProjectPartsForEditor => "RegisterProjectPartsForEditor",
            MessageTag::UnregisterProjectPartsForEditor => "UnregisterProjectPartsForEditor",
            MessageTag::RegisterUnsavedFilesForEditor => "RegisterUnsavedFilesForEditor",
            MessageTag::UnregisterUnsavedFilesForEditor => "UnregisterUnsavedFilesForEditor",
            MessageTag::CompleteCode => "CompleteCode",
            MessageTag::RequestDocumentAnnotations => "RequestDocumentAnnotations",
            MessageTag::RequestReferences => "RequestReferences",
            MessageTag::RequestFollowSymbol => "RequestFollowSymbol",
            MessageTag::RequestToolTip => "RequestToolTip",
            MessageTag::UpdateVisibleTranslationUnits => "UpdateVisibleTranslationUnits",
            MessageTag::Alive => "Alive",
            MessageTag::Echo => "Echo",
            MessageTag::CodeCompleted => "CodeCompleted",
            MessageTag::DocumentAnnotationsChanged => "DocumentAnnotationsChanged",
            MessageTag::References => "References",
            MessageTag::FollowSymbol => "FollowSymbol",
            MessageTag::ToolTip => "ToolTip",
            MessageTag::TranslationUnitDoesNotExist => "TranslationUnitDoesNotExist",
            MessageTag::ProjectPartsDoNotExist => "ProjectPartsDoNotExist",
        }
    }
}

impl TryFrom<u8> for MessageTag {
    type Error = MessageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value == 0 {
            return Ok(MessageTag::Invalid);
        }
        MessageTag::ALL
            .get(usize::from(value) - 1)
            .copied()
            .ok_or(MessageError::UnknownTag(value))
    }
}

impl From<MessageTag> for u8 {
    fn from(tag: MessageTag) -> Self {
        tag.value()
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
