use bytes::Bytes;
use ipcbridge_frame::Envelope;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{MessageError, Result};
use crate::tag::MessageTag;
use crate::types::{
    CodeCompletion, DiagnosticContainer, FileContainer, ProjectPartContainer, ReferenceLocation,
    SourceRange, TokenInfo, ToolTipInfo,
};

/// A concrete message type with a fixed registry tag.
///
/// The payload is the JSON encoding of the value. Messages without fields
/// travel with an empty payload.
pub trait MessageType: Sized {
    const TAG: MessageTag;

    fn encode_payload(&self) -> Result<Bytes>;

    fn decode_payload(payload: &[u8]) -> Result<Self>;
}

fn to_json<T: Serialize>(value: &T) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

fn from_json<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(payload)?)
}

macro_rules! json_message {
    ($($ty:ident => $tag:ident),+ $(,)?) => {
        $(
            impl MessageType for $ty {
                const TAG: MessageTag = MessageTag::$tag;

                fn encode_payload(&self) -> Result<Bytes> {
                    to_json(self)
                }

                fn decode_payload(payload: &[u8]) -> Result<Self> {
                    from_json(payload)
                }
            }
        )+
    };
}

macro_rules! empty_message {
    ($($ty:ident => $tag:ident),+ $(,)?) => {
        $(
            impl MessageType for $ty {
                const TAG: MessageTag = MessageTag::$tag;

                fn encode_payload(&self) -> Result<Bytes> {
                    Ok(Bytes::new())
                }

                fn decode_payload(_payload: &[u8]) -> Result<Self> {
                    Ok($ty)
                }
            }
        )+
    };
}

/// Wrapping typed messages into envelopes and back.
pub trait EnvelopeExt {
    /// Serialize `message` and tag it with its registry tag.
    fn wrap<M: MessageType>(message: &M) -> Result<Envelope>;

    /// Decode the payload as `M` after checking the tag matches `M::TAG`.
    fn unwrap_as<M: MessageType>(&self) -> Result<M>;

    /// The registry tag, or `UnknownTag` when the byte is unregistered.
    fn message_tag(&self) -> Result<MessageTag>;
}

impl EnvelopeExt for Envelope {
    fn wrap<M: MessageType>(message: &M) -> Result<Envelope> {
        Ok(Envelope::new(M::TAG.value(), message.encode_payload()?))
    }

    fn unwrap_as<M: MessageType>(&self) -> Result<M> {
        if self.tag() != M::TAG.value() {
            return Err(MessageError::TagMismatch {
                expected: M::TAG,
                actual: self.tag(),
            });
        }
        M::decode_payload(self.payload())
    }

    fn message_tag(&self) -> Result<MessageTag> {
        MessageTag::try_from(self.tag())
    }
}

// Editor to backend.

/// Asks the backend to shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndMessage;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterTranslationUnitsForEditorMessage {
    pub file_containers: Vec<FileContainer>,
    pub current_editor_file_path: String,
    #[serde(default)]
    pub visible_editor_file_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateTranslationUnitsForEditorMessage {
    pub file_containers: Vec<FileContainer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnregisterTranslationUnitsForEditorMessage {
    pub file_containers: Vec<FileContainer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterProjectPartsForEditorMessage {
    pub project_containers: Vec<ProjectPartContainer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnregisterProjectPartsForEditorMessage {
    pub project_part_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterUnsavedFilesForEditorMessage {
    pub file_containers: Vec<FileContainer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnregisterUnsavedFilesForEditorMessage {
    pub file_containers: Vec<FileContainer>,
}

/// Completion request at a cursor position. Answered by [`CodeCompletedMessage`]
/// with the same ticket number.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompleteCodeMessage {
    pub file_path: String,
    pub project_part_id: String,
    pub line: u32,
    pub column: u32,
    pub ticket_number: u64,
    #[serde(default)]
    pub function_name_location: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestDocumentAnnotationsMessage {
    pub file_container: FileContainer,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestReferencesMessage {
    pub file_container: FileContainer,
    pub line: u32,
    pub column: u32,
    pub ticket_number: u64,
    #[serde(default)]
    pub local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestFollowSymbolMessage {
    pub file_container: FileContainer,
    pub line: u32,
    pub column: u32,
    pub ticket_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestToolTipMessage {
    pub file_container: FileContainer,
    pub line: u32,
    pub column: u32,
    pub ticket_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateVisibleTranslationUnitsMessage {
    pub current_editor_file_path: String,
    #[serde(default)]
    pub visible_editor_file_paths: Vec<String>,
}

// Backend to editor.

/// Sent periodically by an idle backend to prove it is still responsive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AliveMessage;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EchoMessage {
    pub message: String,
}

impl EchoMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeCompletedMessage {
    pub code_completions: Vec<CodeCompletion>,
    pub ticket_number: u64,
    #[serde(default)]
    pub never_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentAnnotationsChangedMessage {
    pub file_container: FileContainer,
    #[serde(default)]
    pub diagnostics: Vec<DiagnosticContainer>,
    #[serde(default)]
    pub first_header_error: Option<DiagnosticContainer>,
    #[serde(default)]
    pub token_infos: Vec<TokenInfo>,
    #[serde(default)]
    pub skipped_preprocessor_ranges: Vec<SourceRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReferencesMessage {
    pub file_container: FileContainer,
    pub references: Vec<ReferenceLocation>,
    pub ticket_number: u64,
    #[serde(default)]
    pub is_local_variable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FollowSymbolMessage {
    pub file_container: FileContainer,
    /// Definition location, `None` when the symbol could not be resolved.
    pub range: Option<SourceRange>,
    pub ticket_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolTipMessage {
    pub file_container: FileContainer,
    pub tool_tip: ToolTipInfo,
    pub ticket_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TranslationUnitDoesNotExistMessage {
    pub file_container: FileContainer,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectPartsDoNotExistMessage {
    pub project_part_ids: Vec<String>,
}

empty_message! {
    EndMessage => End,
    AliveMessage => Alive,
}

json_message! {
    RegisterTranslationUnitsForEditorMessage => RegisterTranslationUnitsForEditor,
    UpdateTranslationUnitsForEditorMessage => UpdateTranslationUnitsForEditor,
    UnregisterTranslationUnitsForEditorMessage => UnregisterTranslationUnitsForEditor,
    RegisterProjectPartsForEditorMessage => RegisterProjectPartsForEditor,
    UnregisterProjectPartsForEditorMessage => UnregisterProjectPartsForEditor,
    RegisterUnsavedFilesForEditorMessage => RegisterUnsavedFilesForEditor,
    UnregisterUnsavedFilesForEditorMessage => UnregisterUnsavedFilesForEditor,
    CompleteCodeMessage => CompleteCode,
    RequestDocumentAnnotationsMessage => RequestDocumentAnnotations,
    RequestReferencesMessage => RequestReferences,
    RequestFollowSymbolMessage => RequestFollowSymbol,
    RequestToolTipMessage => RequestToolTip,
    UpdateVisibleTranslationUnitsMessage => UpdateVisibleTranslationUnits,
    EchoMessage => Echo,
    CodeCompletedMessage => CodeCompleted,
    DocumentAnnotationsChangedMessage => DocumentAnnotationsChanged,
    ReferencesMessage => References,
    FollowSymbolMessage => FollowSymbol,
    ToolTipMessage => ToolTip,
    TranslationUnitDoesNotExistMessage => TranslationUnitDoesNotExist,
    ProjectPartsDoNotExistMessage => ProjectPartsDoNotExist,
}
