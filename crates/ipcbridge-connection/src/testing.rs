//! In-process stand-ins for a worker, used by the supervisor tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ipcbridge_frame::{Envelope, FrameReader, FrameWriter};
use ipcbridge_messages::{
    AliveMessage, ClientMessage, CodeCompletedMessage, CodeModelClient, DocumentAnnotationsChangedMessage,
    EchoMessage, EnvelopeExt, FollowSymbolMessage, MessageTag, ProjectPartsDoNotExistMessage,
    ReferencesMessage, ServerMessage, ToolTipMessage, TranslationUnitDoesNotExistMessage,
};
use ipcbridge_transport::UnixDomainSocket;

use crate::client::ConnectionObserver;
use crate::error::Result;
use crate::process::{WorkerCommand, WorkerLauncher, WorkerProcess};

/// How a fake worker behaves.
#[derive(Debug, Clone, Copy)]
pub struct Behavior {
    pub connects: bool,
    pub honors_end: bool,
    pub honors_terminate: bool,
    /// Send an alive message this often.
    pub alive_every: Option<Duration>,
    /// Answer `CompleteCode` with `CodeCompleted` for the same ticket.
    pub answers_completion: bool,
    /// Exit on its own this long after starting.
    pub exits_after: Option<Duration>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            connects: true,
            honors_end: true,
            honors_terminate: true,
            alive_every: None,
            answers_completion: false,
            exits_after: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub running: AtomicBool,
    pub stop: AtomicBool,
    pub ended: AtomicBool,
    pub terminated: AtomicUsize,
    pub killed: AtomicUsize,
}

/// Launches fake workers on threads that connect back over the real socket.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    pub behavior: Behavior,
    pub processes: Arc<Mutex<Vec<Arc<FakeState>>>>,
    pub commands: Arc<Mutex<Vec<WorkerCommand>>>,
}

impl FakeLauncher {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn launches(&self) -> usize {
        self.processes.lock().unwrap().len()
    }

    pub fn process(&self, index: usize) -> Arc<FakeState> {
        Arc::clone(&self.processes.lock().unwrap()[index])
    }

    pub fn last_command(&self) -> WorkerCommand {
        self.commands.lock().unwrap().last().cloned().unwrap()
    }
}

impl WorkerLauncher for FakeLauncher {
    fn launch(&mut self, command: &WorkerCommand) -> Result<Box<dyn WorkerProcess>> {
        let state = Arc::new(FakeState::default());
        state.running.store(true, Ordering::SeqCst);
        self.processes.lock().unwrap().push(Arc::clone(&state));
        self.commands.lock().unwrap().push(command.clone());

        let behavior = self.behavior;
        let endpoint = command.endpoint.clone();
        let thread_state = Arc::clone(&state);
        std::thread::spawn(move || {
            if behavior.connects {
                run_worker(behavior, endpoint, &thread_state);
            } else {
                idle(behavior, &thread_state);
            }
            thread_state.running.store(false, Ordering::SeqCst);
        });

        Ok(Box::new(FakeProcess {
            state,
            honors_terminate: behavior.honors_terminate,
        }))
    }
}

fn idle(behavior: Behavior, state: &FakeState) {
    let started = Instant::now();
    while !state.stop.load(Ordering::SeqCst) {
        if behavior.exits_after.is_some_and(|after| started.elapsed() >= after) {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn run_worker(behavior: Behavior, endpoint: PathBuf, state: &FakeState) {
    let Ok(stream) = UnixDomainSocket::connect(&endpoint) else {
        return;
    };
    stream.set_nonblocking(true).unwrap();
    let mut writer = FrameWriter::new(stream.try_clone().unwrap());
    let mut reader = FrameReader::new(stream);

    let connected_at = Instant::now();
    let mut last_alive = Instant::now();
    while !state.stop.load(Ordering::SeqCst) {
        for envelope in reader.read_all().unwrap_or_default() {
            match ServerMessage::from_envelope(&envelope) {
                Ok(ServerMessage::End(_)) if behavior.honors_end => {
                    state.ended.store(true, Ordering::SeqCst);
                    return;
                }
                Ok(ServerMessage::CompleteCode(request)) if behavior.answers_completion => {
                    let answer = CodeCompletedMessage {
                        ticket_number: request.ticket_number,
                        ..CodeCompletedMessage::default()
                    };
                    writer.write(&Envelope::wrap(&answer).unwrap());
                }
                _ => {}
            }
        }
        if let Some(every) = behavior.alive_every {
            if last_alive.elapsed() >= every {
                writer.write(&Envelope::wrap(&AliveMessage).unwrap());
                last_alive = Instant::now();
            }
        }
        if behavior
            .exits_after
            .is_some_and(|after| connected_at.elapsed() >= after)
        {
            state.ended.store(true, Ordering::SeqCst);
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

pub struct FakeProcess {
    state: Arc<FakeState>,
    honors_terminate: bool,
}

impl WorkerProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    fn is_running(&mut self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    fn wait_for_exit(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_running() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    fn terminate(&mut self) -> bool {
        self.state.terminated.fetch_add(1, Ordering::SeqCst);
        if self.honors_terminate {
            self.state.stop.store(true, Ordering::SeqCst);
        }
        true
    }

    fn kill(&mut self) -> bool {
        self.state.killed.fetch_add(1, Ordering::SeqCst);
        self.state.stop.store(true, Ordering::SeqCst);
        true
    }

    fn exit_code(&self) -> Option<i32> {
        let running = self.state.running.load(Ordering::SeqCst);
        (!running && self.state.ended.load(Ordering::SeqCst)).then_some(0)
    }
}

/// Lifecycle events in the order a client reported them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected,
    Disconnected,
    Finished(Option<i32>),
    Restarted,
}

#[derive(Clone, Default)]
pub struct RecordingObserver {
    pub events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

impl ConnectionObserver for RecordingObserver {
    fn connected_to_local_socket(&mut self) {
        self.events.lock().unwrap().push(Event::Connected);
    }
    fn disconnected_from_local_socket(&mut self) {
        self.events.lock().unwrap().push(Event::Disconnected);
    }
    fn process_finished(&mut self, exit_code: Option<i32>) {
        self.events.lock().unwrap().push(Event::Finished(exit_code));
    }
    fn process_restarted(&mut self) {
        self.events.lock().unwrap().push(Event::Restarted);
    }
}

/// Keeps every message the editor side received.
#[derive(Debug, Default)]
pub struct RecordingClient {
    pub received: Vec<ClientMessage>,
}

impl RecordingClient {
    pub fn count(&self, tag: MessageTag) -> usize {
        self.received.iter().filter(|m| m.tag() == tag).count()
    }
}

impl CodeModelClient for RecordingClient {
    fn alive(&mut self) {
        self.received.push(ClientMessage::Alive(AliveMessage));
    }
    fn echo(&mut self, message: EchoMessage) {
        self.received.push(ClientMessage::Echo(message));
    }
    fn code_completed(&mut self, message: CodeCompletedMessage) {
        self.received.push(ClientMessage::CodeCompleted(message));
    }
    fn document_annotations_changed(&mut self, message: DocumentAnnotationsChangedMessage) {
        self.received
            .push(ClientMessage::DocumentAnnotationsChanged(message));
    }
    fn references(&mut self, message: ReferencesMessage) {
        self.received.push(ClientMessage::References(message));
    }
    fn follow_symbol(&mut self, message: FollowSymbolMessage) {
        self.received.push(ClientMessage::FollowSymbol(message));
    }
    fn tool_tip(&mut self, message: ToolTipMessage) {
        self.received.push(ClientMessage::ToolTip(message));
    }
    fn translation_unit_does_not_exist(&mut self, message: TranslationUnitDoesNotExistMessage) {
        self.received
            .push(ClientMessage::TranslationUnitDoesNotExist(message));
    }
    fn project_parts_do_not_exist(&mut self, message: ProjectPartsDoNotExistMessage) {
        self.received.push(ClientMessage::ProjectPartsDoNotExist(message));
    }
}
