use std::io::Write;

use ipcbridge_frame::{Envelope, FrameWriter};
use tracing::warn;

use crate::client::ClientDispatcher;
use crate::error::{MessageError, Result};
use crate::messages::*;
use crate::tag::{Direction, MessageTag};

/// Handler for messages sent from the editor to the backend.
pub trait CodeModelServer {
    fn end(&mut self);
    fn register_translation_units_for_editor(
        &mut self,
        message: RegisterTranslationUnitsForEditorMessage,
    );
    fn update_translation_units_for_editor(&mut self, message: UpdateTranslationUnitsForEditorMessage);
    fn unregister_translation_units_for_editor(
        &mut self,
        message: UnregisterTranslationUnitsForEditorMessage,
    );
    fn register_project_parts_for_editor(&mut self, message: RegisterProjectPartsForEditorMessage);
    fn unregister_project_parts_for_editor(
        &mut self,
        message: UnregisterProjectPartsForEditorMessage,
    );
    fn register_unsaved_files_for_editor(&mut self, message: RegisterUnsavedFilesForEditorMessage);
    fn unregister_unsaved_files_for_editor(
        &mut self,
        message: UnregisterUnsavedFilesForEditorMessage,
    );
    fn complete_code(&mut self, message: CompleteCodeMessage);
    fn request_document_annotations(&mut self, message: RequestDocumentAnnotationsMessage);
    fn request_references(&mut self, message: RequestReferencesMessage);
    fn request_follow_symbol(&mut self, message: RequestFollowSymbolMessage);
    fn request_tool_tip(&mut self, message: RequestToolTipMessage);
    fn update_visible_translation_units(&mut self, message: UpdateVisibleTranslationUnitsMessage);
}

/// A backend implementation that also owns the outbound fan-out to editors.
pub trait BackendServer: CodeModelServer {
    fn client_dispatcher(&mut self) -> &mut ClientDispatcher;
}

/// Every message the backend can receive, decoded once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    End(EndMessage),
    RegisterTranslationUnitsForEditor(RegisterTranslationUnitsForEditorMessage),
    UpdateTranslationUnitsForEditor(UpdateTranslationUnitsForEditorMessage),
    UnregisterTranslationUnitsForEditor(UnregisterTranslationUnitsForEditorMessage),
    RegisterProjectPartsForEditor(RegisterProjectPartsForEditorMessage),
    UnregisterProjectPartsForEditor(UnregisterProjectPartsForEditorMessage),
    RegisterUnsavedFilesForEditor(RegisterUnsavedFilesForEditorMessage),
    UnregisterUnsavedFilesForEditor(UnregisterUnsavedFilesForEditorMessage),
    CompleteCode(CompleteCodeMessage),
    RequestDocumentAnnotations(RequestDocumentAnnotationsMessage),
    RequestReferences(RequestReferencesMessage),
    RequestFollowSymbol(RequestFollowSymbolMessage),
    RequestToolTip(RequestToolTipMessage),
    UpdateVisibleTranslationUnits(UpdateVisibleTranslationUnitsMessage),
}

impl ServerMessage {
    /// Decode an envelope read off the wire.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let tag = MessageTag::try_from(envelope.tag())?;
        let payload = envelope.payload().as_ref();
        let message = match tag {
            MessageTag::Invalid => return Err(MessageError::InvalidTag),
            MessageTag::End => Self::End(EndMessage::decode_payload(payload)?),
            MessageTag::RegisterTranslationUnitsForEditor => {
                Self::RegisterTranslationUnitsForEditor(MessageType::decode_payload(payload)?)
            }
            MessageTag::UpdateTranslationUnitsForEditor => {
                Self::UpdateTranslationUnitsForEditor(MessageType::decode_payload(payload)?)
            }
            MessageTag::UnregisterTranslationUnitsForEditor => {
                Self::UnregisterTranslationUnitsForEditor(MessageType::decode_payload(payload)?)
            }
            MessageTag::RegisterProjectPartsForEditor => {
                Self::RegisterProjectPartsForEditor(MessageType::decode_payload(payload)?)
            }
            MessageTag::UnregisterProjectPartsForEditor => {
                Self::UnregisterProjectPartsForEditor(MessageType::decode_payload(payload)?)
            }
            MessageTag::RegisterUnsavedFilesForEditor => {
                Self::RegisterUnsavedFilesForEditor(MessageType::decode_payload(payload)?)
            }
            MessageTag::UnregisterUnsavedFilesForEditor => {
                Self::UnregisterUnsavedFilesForEditor(MessageType::decode_payload(payload)?)
            }
            MessageTag::CompleteCode => Self::CompleteCode(MessageType::decode_payload(payload)?),
            MessageTag::RequestDocumentAnnotations => {
                Self::RequestDocumentAnnotations(MessageType::decode_payload(payload)?)
            }
            MessageTag::RequestReferences => {
                Self::RequestReferences(MessageType::decode_payload(payload)?)
            }
            MessageTag::RequestFollowSymbol => {
                Self::RequestFollowSymbol(MessageType::decode_payload(payload)?)
            }
            MessageTag::RequestToolTip => Self::RequestToolTip(MessageType::decode_payload(payload)?),
            MessageTag::UpdateVisibleTranslationUnits => {
                Self::UpdateVisibleTranslationUnits(MessageType::decode_payload(payload)?)
            }
            other => {
                debug_assert_eq!(other.direction(), Some(Direction::ToClient));
                return Err(MessageError::UnexpectedTag(other));
            }
        };
        Ok(message)
    }

    /// Encode back into a wire envelope.
    pub fn to_envelope(&self) -> Result<Envelope> {
        match self {
            Self::End(m) => Envelope::wrap(m),
            Self::RegisterTranslationUnitsForEditor(m) => Envelope::wrap(m),
            Self::UpdateTranslationUnitsForEditor(m) => Envelope::wrap(m),
            Self::UnregisterTranslationUnitsForEditor(m) => Envelope::wrap(m),
            Self::RegisterProjectPartsForEditor(m) => Envelope::wrap(m),
            Self::UnregisterProjectPartsForEditor(m) => Envelope::wrap(m),
            Self::RegisterUnsavedFilesForEditor(m) => Envelope::wrap(m),
            Self::UnregisterUnsavedFilesForEditor(m) => Envelope::wrap(m),
            Self::CompleteCode(m) => Envelope::wrap(m),
            Self::RequestDocumentAnnotations(m) => Envelope::wrap(m),
            Self::RequestReferences(m) => Envelope::wrap(m),
            Self::RequestFollowSymbol(m) => Envelope::wrap(m),
            Self::RequestToolTip(m) => Envelope::wrap(m),
            Self::UpdateVisibleTranslationUnits(m) => Envelope::wrap(m),
        }
    }

    pub fn tag(&self) -> MessageTag {
        match self {
            Self::End(_) => MessageTag::End,
            Self::RegisterTranslationUnitsForEditor(_) => MessageTag::RegisterTranslationUnitsForEditor,
            Self::UpdateTranslationUnitsForEditor(_) => MessageTag::UpdateTranslationUnitsForEditor,
            Self::UnregisterTranslationUnitsForEditor(_) => {
                MessageTag::UnregisterTranslationUnitsForEditor
            }
            Self::RegisterProjectPartsForEditor(_) => MessageTag::RegisterProjectPartsForEditor,
            Self::UnregisterProjectPartsForEditor(_) => MessageTag::UnregisterProjectPartsForEditor,
            Self::RegisterUnsavedFilesForEditor(_) => MessageTag::RegisterUnsavedFilesForEditor,
            Self::UnregisterUnsavedFilesForEditor(_) => MessageTag::UnregisterUnsavedFilesForEditor,
            Self::CompleteCode(_) => MessageTag::CompleteCode,
            Self::RequestDocumentAnnotations(_) => MessageTag::RequestDocumentAnnotations,
            Self::RequestReferences(_) => MessageTag::RequestReferences,
            Self::RequestFollowSymbol(_) => MessageTag::RequestFollowSymbol,
            Self::RequestToolTip(_) => MessageTag::RequestToolTip,
            Self::UpdateVisibleTranslationUnits(_) => MessageTag::UpdateVisibleTranslationUnits,
        }
    }

    /// Invoke the matching handler method.
    pub fn dispatch(self, handler: &mut (impl CodeModelServer + ?Sized)) {
        match self {
            Self::End(_) => handler.end(),
            Self::RegisterTranslationUnitsForEditor(m) => {
                handler.register_translation_units_for_editor(m)
            }
            Self::UpdateTranslationUnitsForEditor(m) => handler.update_translation_units_for_editor(m),
            Self::UnregisterTranslationUnitsForEditor(m) => {
                handler.unregister_translation_units_for_editor(m)
            }
            Self::RegisterProjectPartsForEditor(m) => handler.register_project_parts_for_editor(m),
            Self::UnregisterProjectPartsForEditor(m) => {
                handler.unregister_project_parts_for_editor(m)
            }
            Self::RegisterUnsavedFilesForEditor(m) => handler.register_unsaved_files_for_editor(m),
            Self::UnregisterUnsavedFilesForEditor(m) => {
                handler.unregister_unsaved_files_for_editor(m)
            }
            Self::CompleteCode(m) => handler.complete_code(m),
            Self::RequestDocumentAnnotations(m) => handler.request_document_annotations(m),
            Self::RequestReferences(m) => handler.request_references(m),
            Self::RequestFollowSymbol(m) => handler.request_follow_symbol(m),
            Self::RequestToolTip(m) => handler.request_tool_tip(m),
            Self::UpdateVisibleTranslationUnits(m) => handler.update_visible_translation_units(m),
        }
    }
}

/// Decode `envelope` and call the matching method on `handler`.
///
/// Envelopes that cannot be decoded are logged and dropped. Returns whether a
/// handler method was invoked.
pub fn dispatch_server_envelope(
    handler: &mut (impl CodeModelServer + ?Sized),
    envelope: &Envelope,
) -> bool {
    match ServerMessage::from_envelope(envelope) {
        Ok(message) => {
            message.dispatch(handler);
            true
        }
        Err(err) => {
            warn!(tag = envelope.tag(), error = %err, ?envelope, "unknown message dropped");
            false
        }
    }
}

/// Sends server calls over a frame writer; the editor side's handle on the backend.
pub struct ServerProxy<W> {
    writer: FrameWriter<W>,
}

impl<W: Write> ServerProxy<W> {
    pub fn new(writer: FrameWriter<W>) -> Self {
        Self { writer }
    }

    /// Wrap and write any backend-bound message.
    pub fn send(&mut self, message: &ServerMessage) {
        match message.to_envelope() {
            Ok(envelope) => self.writer.write(&envelope),
            Err(err) => warn!(tag = %message.tag(), error = %err, "failed to encode message"),
        }
    }

    fn send_message<M: MessageType>(&mut self, message: &M) {
        match Envelope::wrap(message) {
            Ok(envelope) => self.writer.write(&envelope),
            Err(err) => warn!(tag = %M::TAG, error = %err, "failed to encode message"),
        }
    }

    pub fn writer(&self) -> &FrameWriter<W> {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut FrameWriter<W> {
        &mut self.writer
    }

    pub fn into_writer(self) -> FrameWriter<W> {
        self.writer
    }
}

impl<W: Write> CodeModelServer for ServerProxy<W> {
    fn end(&mut self) {
        self.send_message(&EndMessage);
    }

    fn register_translation_units_for_editor(
        &mut self,
        message: RegisterTranslationUnitsForEditorMessage,
    ) {
        self.send_message(&message);
    }

    fn update_translation_units_for_editor(&mut self, message: UpdateTranslationUnitsForEditorMessage) {
        self.send_message(&message);
    }

    fn unregister_translation_units_for_editor(
        &mut self,
        message: UnregisterTranslationUnitsForEditorMessage,
    ) {
        self.send_message(&message);
    }

    fn register_project_parts_for_editor(&mut self, message: RegisterProjectPartsForEditorMessage) {
        self.send_message(&message);
    }

    fn unregister_project_parts_for_editor(
        &mut self,
        message: UnregisterProjectPartsForEditorMessage,
    ) {
        self.send_message(&message);
    }

    fn register_unsaved_files_for_editor(&mut self, message: RegisterUnsavedFilesForEditorMessage) {
        self.send_message(&message);
    }

    fn unregister_unsaved_files_for_editor(
        &mut self,
        message: UnregisterUnsavedFilesForEditorMessage,
    ) {
        self.send_message(&message);
    }

    fn complete_code(&mut self, message: CompleteCodeMessage) {
        self.send_message(&message);
    }

    fn request_document_annotations(&mut self, message: RequestDocumentAnnotationsMessage) {
        self.send_message(&message);
    }

    fn request_references(&mut self, message: RequestReferencesMessage) {
        self.send_message(&message);
    }

    fn request_follow_symbol(&mut self, message: RequestFollowSymbolMessage) {
        self.send_message(&message);
    }

    fn request_tool_tip(&mut self, message: RequestToolTipMessage) {
        self.send_message(&message);
    }

    fn update_visible_translation_units(&mut self, message: UpdateVisibleTranslationUnitsMessage) {
        self.send_message(&message);
    }
}
