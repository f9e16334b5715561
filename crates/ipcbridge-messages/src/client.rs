use std::io::Write;

use ipcbridge_frame::{Envelope, FrameWriter};
use tracing::{debug, warn};

use crate::error::{MessageError, Result};
use crate::messages::*;
use crate::tag::{Direction, MessageTag};

/// Handler for messages sent from the backend to the editor.
pub trait CodeModelClient {
    fn alive(&mut self);
    fn echo(&mut self, message: EchoMessage);
    fn code_completed(&mut self, message: CodeCompletedMessage);
    fn document_annotations_changed(&mut self, message: DocumentAnnotationsChangedMessage);
    fn references(&mut self, message: ReferencesMessage);
    fn follow_symbol(&mut self, message: FollowSymbolMessage);
    fn tool_tip(&mut self, message: ToolTipMessage);
    fn translation_unit_does_not_exist(&mut self, message: TranslationUnitDoesNotExistMessage);
    fn project_parts_do_not_exist(&mut self, message: ProjectPartsDoNotExistMessage);
}

/// Every message the editor can receive, decoded once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Alive(AliveMessage),
    Echo(EchoMessage),
    CodeCompleted(CodeCompletedMessage),
    DocumentAnnotationsChanged(DocumentAnnotationsChangedMessage),
    References(ReferencesMessage),
    FollowSymbol(FollowSymbolMessage),
    ToolTip(ToolTipMessage),
    TranslationUnitDoesNotExist(TranslationUnitDoesNotExistMessage),
    ProjectPartsDoNotExist(ProjectPartsDoNotExistMessage),
}

impl ClientMessage {
    /// Decode an envelope read off the wire.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let tag = MessageTag::try_from(envelope.tag())?;
        let payload = envelope.payload().as_ref();
        let message = match tag {
            MessageTag::Invalid => return Err(MessageError::InvalidTag),
            MessageTag::Alive => Self::Alive(AliveMessage::decode_payload(payload)?),
            MessageTag::Echo => Self::Echo(MessageType::decode_payload(payload)?),
            MessageTag::CodeCompleted => Self::CodeCompleted(MessageType::decode_payload(payload)?),
            MessageTag::DocumentAnnotationsChanged => {
                Self::DocumentAnnotationsChanged(MessageType::decode_payload(payload)?)
            }
            MessageTag::References => Self::References(MessageType::decode_payload(payload)?),
            MessageTag::FollowSymbol => Self::FollowSymbol(MessageType::decode_payload(payload)?),
            MessageTag::ToolTip => Self::ToolTip(MessageType::decode_payload(payload)?),
            MessageTag::TranslationUnitDoesNotExist => {
                Self::TranslationUnitDoesNotExist(MessageType::decode_payload(payload)?)
            }
            MessageTag::ProjectPartsDoNotExist => {
                Self::ProjectPartsDoNotExist(MessageType::decode_payload(payload)?)
            }
            other => {
                debug_assert_eq!(other.direction(), Some(Direction::ToServer));
                return Err(MessageError::UnexpectedTag(other));
            }
        };
        Ok(message)
    }

    /// Encode back into a wire envelope.
    pub fn to_envelope(&self) -> Result<Envelope> {
        match self {
            Self::Alive(m) => Envelope::wrap(m),
            Self::Echo(m) => Envelope::wrap(m),
            Self::CodeCompleted(m) => Envelope::wrap(m),
            Self::DocumentAnnotationsChanged(m) => Envelope::wrap(m),
            Self::References(m) => Envelope::wrap(m),
            Self::FollowSymbol(m) => Envelope::wrap(m),
            Self::ToolTip(m) => Envelope::wrap(m),
            Self::TranslationUnitDoesNotExist(m) => Envelope::wrap(m),
            Self::ProjectPartsDoNotExist(m) => Envelope::wrap(m),
        }
    }

    pub fn tag(&self) -> MessageTag {
        match self {
            Self::Alive(_) => MessageTag::Alive,
            Self::Echo(_) => MessageTag::Echo,
            Self::CodeCompleted(_) => MessageTag::CodeCompleted,
            Self::DocumentAnnotationsChanged(_) => MessageTag::DocumentAnnotationsChanged,
            Self::References(_) => MessageTag::References,
            Self::FollowSymbol(_) => MessageTag::FollowSymbol,
            Self::ToolTip(_) => MessageTag::ToolTip,
            Self::TranslationUnitDoesNotExist(_) => MessageTag::TranslationUnitDoesNotExist,
            Self::ProjectPartsDoNotExist(_) => MessageTag::ProjectPartsDoNotExist,
        }
    }

    /// Invoke the matching handler method.
    pub fn dispatch(self, handler: &mut (impl CodeModelClient + ?Sized)) {
        match self {
            Self::Alive(_) => handler.alive(),
            Self::Echo(m) => handler.echo(m),
            Self::CodeCompleted(m) => handler.code_completed(m),
            Self::DocumentAnnotationsChanged(m) => handler.document_annotations_changed(m),
            Self::References(m) => handler.references(m),
            Self::FollowSymbol(m) => handler.follow_symbol(m),
            Self::ToolTip(m) => handler.tool_tip(m),
            Self::TranslationUnitDoesNotExist(m) => handler.translation_unit_does_not_exist(m),
            Self::ProjectPartsDoNotExist(m) => handler.project_parts_do_not_exist(m),
        }
    }
}

/// Decode `envelope` and call the matching method on `handler`.
///
/// Envelopes that cannot be decoded are logged and dropped. Returns whether a
/// handler method was invoked.
pub fn dispatch_client_envelope(
    handler: &mut (impl CodeModelClient + ?Sized),
    envelope: &Envelope,
) -> bool {
    match ClientMessage::from_envelope(envelope) {
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

/// Sends client calls over a frame writer; the backend's handle on one editor.
pub struct ClientProxy<W> {
    writer: FrameWriter<W>,
}

impl<W: Write> ClientProxy<W> {
    pub fn new(writer: FrameWriter<W>) -> Self {
        Self { writer }
    }

    /// Wrap and write any editor-bound message.
    pub fn send(&mut self, message: &ClientMessage) {
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

impl<W: Write> CodeModelClient for ClientProxy<W> {
    fn alive(&mut self) {
        self.send_message(&AliveMessage);
    }

    fn echo(&mut self, message: EchoMessage) {
        self.send_message(&message);
    }

    fn code_completed(&mut self, message: CodeCompletedMessage) {
        self.send_message(&message);
    }

    fn document_annotations_changed(&mut self, message: DocumentAnnotationsChangedMessage) {
        self.send_message(&message);
    }

    fn references(&mut self, message: ReferencesMessage) {
        self.send_message(&message);
    }

    fn follow_symbol(&mut self, message: FollowSymbolMessage) {
        self.send_message(&message);
    }

    fn tool_tip(&mut self, message: ToolTipMessage) {
        self.send_message(&message);
    }

    fn translation_unit_does_not_exist(&mut self, message: TranslationUnitDoesNotExistMessage) {
        self.send_message(&message);
    }

    fn project_parts_do_not_exist(&mut self, message: ProjectPartsDoNotExistMessage) {
        self.send_message(&message);
    }
}

/// Identifies a client registered with a [`ClientDispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientHandle(u64);

/// Broadcasts every client call to all registered clients.
///
/// Clients receive calls in registration order. Registering the same client
/// twice is not detected; it would simply receive every message twice.
#[derive(Default)]
pub struct ClientDispatcher {
    clients: Vec<(ClientHandle, Box<dyn CodeModelClient>)>,
    next_handle: u64,
}

impl ClientDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_client(&mut self, client: Box<dyn CodeModelClient>) -> ClientHandle {
        let handle = ClientHandle(self.next_handle);
        self.next_handle += 1;
        self.clients.push((handle, client));
        debug!(clients = self.clients.len(), "client registered");
        handle
    }

    /// Unregister a client and hand it back.
    pub fn remove_client(&mut self, handle: ClientHandle) -> Option<Box<dyn CodeModelClient>> {
        let index = self.clients.iter().position(|(h, _)| *h == handle)?;
        let (_, client) = self.clients.remove(index);
        debug!(clients = self.clients.len(), "client removed");
        Some(client)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn broadcast<M: Clone>(&mut self, message: M, call: impl Fn(&mut dyn CodeModelClient, M)) {
        if let Some(((_, last), rest)) = self.clients.split_last_mut() {
            for (_, client) in rest {
                call(client.as_mut(), message.clone());
            }
            call(last.as_mut(), message);
        }
    }
}

impl std::fmt::Debug for ClientDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientDispatcher")
            .field("clients", &self.clients.len())
            .finish()
    }
}

impl CodeModelClient for ClientDispatcher {
    fn alive(&mut self) {
        for (_, client) in &mut self.clients {
            client.alive();
        }
    }

    fn echo(&mut self, message: EchoMessage) {
        self.broadcast(message, |client, m| client.echo(m));
    }

    fn code_completed(&mut self, message: CodeCompletedMessage) {
        self.broadcast(message, |client, m| client.code_completed(m));
    }

    fn document_annotations_changed(&mut self, message: DocumentAnnotationsChangedMessage) {
        self.broadcast(message, |client, m| client.document_annotations_changed(m));
    }

    fn references(&mut self, message: ReferencesMessage) {
        self.broadcast(message, |client, m| client.references(m));
    }

    fn follow_symbol(&mut self, message: FollowSymbolMessage) {
        self.broadcast(message, |client, m| client.follow_symbol(m));
    }

    fn tool_tip(&mut self, message: ToolTipMessage) {
        self.broadcast(message, |client, m| client.tool_tip(m));
    }

    fn translation_unit_does_not_exist(&mut self, message: TranslationUnitDoesNotExistMessage) {
        self.broadcast(message, |client, m| client.translation_unit_does_not_exist(m));
    }

    fn project_parts_do_not_exist(&mut self, message: ProjectPartsDoNotExistMessage) {
        self.broadcast(message, |client, m| client.project_parts_do_not_exist(m));
    }
}
