use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ipcbridge_frame::{FrameReader, FrameWriter};
use ipcbridge_messages::{dispatch_client_envelope, CodeModelClient, CodeModelServer, ServerProxy};
use ipcbridge_transport::{endpoint_path, IpcStream, TransportError, UnixDomainSocket};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, NO_ALIVE_TIMER_ENV};
use crate::error::{ConnectionError, Result};
use crate::process::{WorkerCommand, WorkerLauncher, WorkerProcess};
use crate::timer::AliveTimer;

/// Lifecycle of the supervised worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing started yet.
    NoProcess,
    /// Worker launched, waiting for it to connect back. [`ConnectionClient::poll`]
    /// accepts the connection once it arrives.
    Starting,
    Connected,
    /// The worker went away or its connection closed; the alive timer will
    /// restart it.
    Disconnected,
    /// [`ConnectionClient::finish`] ran.
    Finished,
}

/// Lifecycle notifications from a [`ConnectionClient`].
///
/// These are the only state changes the supervisor reports.
pub trait ConnectionObserver {
    fn connected_to_local_socket(&mut self) {}
    fn disconnected_from_local_socket(&mut self) {}
    fn process_finished(&mut self, _exit_code: Option<i32>) {}
    fn process_restarted(&mut self) {}
}

struct NoopObserver;

impl ConnectionObserver for NoopObserver {}

/// Editor-side supervisor for one backend worker.
///
/// Owns the worker process, the socket it connected back on, and the frame
/// reader/writer pair on top of it. Nothing happens in the background: the
/// owner drives the connection by calling [`poll`](ConnectionClient::poll)
/// (or [`run_for`](ConnectionClient::run_for) /
/// [`run_until`](ConnectionClient::run_until)), which reads and dispatches
/// incoming messages, notices a worker that exited, and checks the alive
/// timer.
///
/// A worker counts as unresponsive when a full alive interval passes with no
/// message received, no call to
/// [`reset_process_alive_timer`](ConnectionClient::reset_process_alive_timer)
/// and no unread bytes queued on the socket. It is then restarted.
pub struct ConnectionClient<H> {
    handler: H,
    launcher: Box<dyn WorkerLauncher>,
    config: ClientConfig,
    state: ConnectionState,
    process: Option<Box<dyn WorkerProcess>>,
    temp_dir: Option<TempDir>,
    endpoint: Option<PathBuf>,
    listener: Option<UnixDomainSocket>,
    connect_started: Option<Instant>,
    connect_error: Option<ConnectionError>,
    reader: Option<FrameReader<IpcStream>>,
    server: Option<ServerProxy<IpcStream>>,
    alive_timer: AliveTimer,
    restart_count: u64,
    observer: Box<dyn ConnectionObserver>,
}

impl<H> ConnectionClient<H> {
    pub fn new(handler: H, launcher: Box<dyn WorkerLauncher>, config: ClientConfig) -> Self {
        let alive_timer = AliveTimer::new(config.alive_interval);
        Self {
            handler,
            launcher,
            config,
            state: ConnectionState::NoProcess,
            process: None,
            temp_dir: None,
            endpoint: None,
            listener: None,
            connect_started: None,
            connect_error: None,
            reader: None,
            server: None,
            alive_timer,
            restart_count: 0,
            observer: Box::new(NoopObserver),
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn ConnectionObserver>) {
        self.observer = observer;
    }

    /// Launch the worker and start listening for it to connect back.
    ///
    /// Returns as soon as the worker is spawned; the connection is accepted
    /// by a later [`poll`](ConnectionClient::poll). A worker that exits or
    /// does not connect within `connect_timeout` is stopped, the client is
    /// left `Disconnected` and the failure is kept for
    /// [`wait_for_connection`](ConnectionClient::wait_for_connection).
    pub fn start(&mut self) -> Result<()> {
        if self.process.is_some() {
            debug!("worker already started");
            return Ok(());
        }

        self.state = ConnectionState::Starting;
        self.alive_timer.start(Instant::now());

        if let Err(err) = self.launch() {
            warn!(error = %err, "failed to start worker");
            self.teardown();
            self.state = ConnectionState::Disconnected;
            return Err(err);
        }
        Ok(())
    }

    fn launch(&mut self) -> Result<()> {
        let temp_dir = tempfile::Builder::new()
            .prefix(&self.config.temp_dir_prefix)
            .tempdir()
            .map_err(ConnectionError::TempDir)?;
        let endpoint = endpoint_path(temp_dir.path(), &self.config.component);
        let listener = UnixDomainSocket::bind(&endpoint)?;

        let mut command =
            WorkerCommand::new(&self.config.component, &endpoint, temp_dir.path());
        if self.config.alive_interval.is_none() {
            command = command.env(NO_ALIVE_TIMER_ENV, "1");
        }

        self.temp_dir = Some(temp_dir);
        self.endpoint = Some(endpoint.clone());
        self.listener = Some(listener);

        let process = self.launcher.launch(&command)?;
        info!(pid = ?process.id(), endpoint = ?endpoint, "worker started");
        self.process = Some(process);
        self.connect_started = Some(Instant::now());
        Ok(())
    }

    /// One accept attempt while `Starting`.
    fn poll_connect(&mut self) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };

        let outcome = match listener.try_accept() {
            Ok(Some(stream)) => {
                self.listener = None;
                self.connect_started = None;
                self.attach(stream)
            }
            Ok(None) => self.check_connect_deadline(),
            Err(err) => Err(err.into()),
        };

        if let Err(err) = outcome {
            warn!(error = %err, "failed to connect to worker");
            self.teardown();
            self.state = ConnectionState::Disconnected;
            self.connect_error = Some(err);
        }
    }

    fn check_connect_deadline(&mut self) -> Result<()> {
        if let Some(process) = self.process.as_mut() {
            if !process.is_running() {
                return Err(ConnectionError::WorkerExited {
                    code: process.exit_code(),
                });
            }
        }
        let waited = self.connect_started.map_or(Duration::ZERO, |at| at.elapsed());
        if waited >= self.config.connect_timeout {
            return Err(TransportError::ConnectTimeout {
                path: self.endpoint.clone().unwrap_or_default(),
                waited,
            }
            .into());
        }
        Ok(())
    }

    fn attach(&mut self, stream: IpcStream) -> Result<()> {
        let reader_stream = stream.try_clone()?;
        let reader = FrameReader::with_config_ipc(reader_stream, self.config.frame.clone())?;
        let writer = FrameWriter::with_config_ipc(stream, self.config.frame.clone())?;

        self.reader = Some(reader);
        self.server = Some(ServerProxy::new(writer));
        self.state = ConnectionState::Connected;
        self.alive_timer.start(Instant::now());
        debug!(endpoint = ?self.endpoint, "connected to worker");
        self.observer.connected_to_local_socket();
        Ok(())
    }

    /// Tear the worker down and start a fresh one in a fresh temp dir.
    pub fn restart(&mut self) -> Result<()> {
        info!(restarts = self.restart_count + 1, "restarting worker");
        self.teardown();
        self.restart_count += 1;
        let result = self.start();
        self.observer.process_restarted();
        result
    }

    /// Stop the worker and release every resource.
    ///
    /// The worker is asked to end and given `end_wait` to exit. A worker
    /// that is still running after that is sent a terminate signal and then
    /// killed, each with its own bounded wait, so this always returns.
    pub fn finish(&mut self) {
        self.alive_timer.stop();
        self.teardown();
        self.state = ConnectionState::Finished;
    }

    fn teardown(&mut self) {
        if let Some(mut process) = self.process.take() {
            let pid = process.id();
            if process.is_running() {
                if let Some(server) = self.server.as_mut() {
                    server.end();
                    if !process.wait_for_exit(self.config.end_wait) {
                        debug!(?pid, "worker ignored end message");
                    }
                }
            }

            self.disconnect();

            if process.is_running() {
                if process.terminate() {
                    process.wait_for_exit(self.config.terminate_wait);
                }
                if process.is_running() {
                    warn!(?pid, "worker unresponsive, killing");
                    process.kill();
                    process.wait_for_exit(self.config.kill_wait);
                }
            }

            let exit_code = process.exit_code();
            info!(?pid, ?exit_code, "worker finished");
            self.observer.process_finished(exit_code);
        }

        self.disconnect();
        self.listener = None;
        self.connect_started = None;
        self.temp_dir = None;
    }

    fn disconnect(&mut self) {
        let mut was_connected = false;
        if let Some(mut reader) = self.reader.take() {
            reader.reset_state();
            if let Err(err) = reader.get_ref().shutdown() {
                debug!(error = %err, "socket shutdown failed");
            }
            was_connected = true;
        }
        if let Some(mut server) = self.server.take() {
            server.writer_mut().reset_state();
            was_connected = true;
        }
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Disconnected;
        }
        if was_connected {
            debug!(endpoint = ?self.endpoint, "disconnected from worker");
            self.observer.disconnected_from_local_socket();
        }
    }

    fn reap_exited_worker(&mut self) {
        let exited = self
            .process
            .as_mut()
            .is_some_and(|process| !process.is_running());
        if !exited {
            return;
        }
        if let Some(process) = self.process.take() {
            let exit_code = process.exit_code();
            warn!(pid = ?process.id(), ?exit_code, "worker exited");
            self.disconnect();
            self.state = ConnectionState::Disconnected;
            self.observer.process_finished(exit_code);
        }
    }

    fn check_alive_timer(&mut self, now: Instant) {
        if self.state == ConnectionState::Starting {
            return;
        }
        if !self.alive_timer.poll(now) {
            return;
        }
        if self.alive_timer.take_reset() {
            return;
        }
        let pending = self.reader.as_ref().map_or(0, |reader| reader.pending_bytes());
        if pending > 0 {
            debug!(pending, "answer in flight, not restarting");
            return;
        }

        warn!("worker is not responding");
        if let Err(err) = self.restart() {
            warn!(error = %err, "restart failed");
        }
    }
}

impl<H: CodeModelClient> ConnectionClient<H> {
    /// Run one turn of the event loop.
    pub fn poll(&mut self) {
        if self.state == ConnectionState::Starting {
            self.poll_connect();
        }
        self.read_messages();
        self.reap_exited_worker();
        self.check_alive_timer(Instant::now());
    }

    fn read_messages(&mut self) {
        let Some(reader) = self.reader.as_mut() else {
            return;
        };

        match reader.read_all() {
            Ok(envelopes) => {
                if !envelopes.is_empty() {
                    self.alive_timer.reset();
                }
                for envelope in &envelopes {
                    dispatch_client_envelope(&mut self.handler, envelope);
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to read from worker");
                reader.discard_buffered();
            }
        }

        if self.reader.as_ref().is_some_and(|reader| reader.is_closed()) {
            debug!("worker closed the connection");
            self.disconnect();
        }
    }

    /// Poll until the worker is connected.
    ///
    /// Returns the connect failure recorded by `poll`, or
    /// [`ConnectionError::NotConnected`] when `timeout` elapses or the
    /// client is not starting a worker.
    pub fn wait_for_connection(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if let Some(err) = self.connect_error.take() {
                return Err(err);
            }
            if self.is_connected() {
                return Ok(());
            }
            if self.state != ConnectionState::Starting || Instant::now() >= deadline {
                return Err(ConnectionError::NotConnected);
            }
            std::thread::sleep(self.config.connect_poll_interval);
        }
    }

    /// Poll repeatedly for `duration`.
    pub fn run_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            self.poll();
            if Instant::now() >= deadline {
                return;
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    /// Poll until `done` holds or `timeout` elapses. Returns whether `done` held.
    pub fn run_until(&mut self, mut done: impl FnMut(&Self) -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if done(&*self) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }
}

impl<H> ConnectionClient<H> {
    /// Sender for requests to the worker, while connected.
    pub fn server(&mut self) -> Option<&mut ServerProxy<IpcStream>> {
        self.server.as_mut()
    }

    /// Ask the worker to end without tearing anything down.
    pub fn send_end(&mut self) {
        if let Some(server) = self.server.as_mut() {
            server.end();
            self.alive_timer.reset();
        }
    }

    /// Record that the worker proved itself alive.
    pub fn reset_process_alive_timer(&mut self) {
        self.alive_timer.reset();
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Endpoint of the current (or last) worker.
    pub fn endpoint(&self) -> Option<&Path> {
        self.endpoint.as_deref()
    }

    /// Temp dir handed to the current worker.
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn restart_count(&self) -> u64 {
        self.restart_count
    }

    /// Take the most recent failure to connect a worker, if any.
    pub fn take_connect_error(&mut self) -> Option<ConnectionError> {
        self.connect_error.take()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl<H> Drop for ConnectionClient<H> {
    fn drop(&mut self) {
        if self.process.is_some() {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use ipcbridge_messages::{CompleteCodeMessage, MessageTag};

    use super::*;
    use crate::testing::{Behavior, Event, FakeLauncher, RecordingClient, RecordingObserver};

    const WAIT: Duration = Duration::from_secs(5);

    fn config(alive_interval: Option<Duration>) -> ClientConfig {
        ClientConfig {
            component: "fake-backend".to_string(),
            alive_interval,
            connect_timeout: Duration::from_secs(5),
            connect_poll_interval: Duration::from_millis(2),
            end_wait: Duration::from_millis(200),
            terminate_wait: Duration::from_millis(200),
            kill_wait: Duration::from_millis(200),
            poll_interval: Duration::from_millis(2),
            ..ClientConfig::default()
        }
    }

    fn client(
        behavior: Behavior,
        config: ClientConfig,
    ) -> (ConnectionClient<RecordingClient>, FakeLauncher, RecordingObserver) {
        let launcher = FakeLauncher::new(behavior);
        let observer = RecordingObserver::default();
        let mut client =
            ConnectionClient::new(RecordingClient::default(), Box::new(launcher.clone()), config);
        client.set_observer(Box::new(observer.clone()));
        (client, launcher, observer)
    }

    fn connect(client: &mut ConnectionClient<RecordingClient>) {
        client.start().unwrap();
        client.wait_for_connection(WAIT).unwrap();
    }

    #[test]
    fn start_connects_and_reports() {
        let (mut client, launcher, observer) = client(Behavior::default(), config(None));
        assert_eq!(client.state(), ConnectionState::NoProcess);

        client.start().unwrap();
        assert_eq!(client.state(), ConnectionState::Starting);
        assert!(observer.events().is_empty());

        client.wait_for_connection(WAIT).unwrap();
        assert!(client.is_connected());
        assert_eq!(observer.events(), vec![Event::Connected]);
        assert_eq!(launcher.launches(), 1);

        let endpoint = client.endpoint().unwrap().to_path_buf();
        let temp_dir = client.temp_dir().unwrap().to_path_buf();
        assert_eq!(endpoint.parent(), Some(temp_dir.as_path()));
        assert_eq!(
            endpoint.file_name().unwrap().to_string_lossy(),
            format!("fake-backend-{}.sock", std::process::id())
        );

        let command = launcher.last_command();
        assert_eq!(command.endpoint, endpoint);
        assert_eq!(command.env_value("TMPDIR"), Some(&temp_dir.clone().into_os_string()));
        assert_eq!(
            command.env_value(NO_ALIVE_TIMER_ENV).map(|v| v.to_string_lossy().into_owned()),
            Some("1".to_string())
        );
    }

    #[test]
    fn alive_interval_is_not_disabled_for_worker() {
        let (mut client, launcher, _) =
            client(Behavior::default(), config(Some(Duration::from_secs(10))));
        connect(&mut client);
        assert!(launcher.last_command().env_value(NO_ALIVE_TIMER_ENV).is_none());
    }

    #[test]
    fn start_twice_is_a_no_op() {
        let (mut client, launcher, _) = client(Behavior::default(), config(None));
        client.start().unwrap();
        client.start().unwrap();
        client.wait_for_connection(WAIT).unwrap();
        client.start().unwrap();
        assert_eq!(launcher.launches(), 1);
    }

    #[test]
    fn finish_ends_worker_gracefully() {
        let (mut client, launcher, observer) = client(Behavior::default(), config(None));
        connect(&mut client);
        let temp_dir = client.temp_dir().unwrap().to_path_buf();

        client.finish();

        let process = launcher.process(0);
        assert!(process.ended.load(Ordering::SeqCst));
        assert_eq!(process.terminated.load(Ordering::SeqCst), 0);
        assert_eq!(process.killed.load(Ordering::SeqCst), 0);
        assert_eq!(client.state(), ConnectionState::Finished);
        assert!(client.server().is_none());
        assert!(!temp_dir.exists());
        assert_eq!(
            observer.events(),
            vec![Event::Connected, Event::Disconnected, Event::Finished(Some(0))]
        );
    }

    #[test]
    fn finish_terminates_worker_ignoring_end() {
        let behavior = Behavior {
            honors_end: false,
            ..Behavior::default()
        };
        let (mut client, launcher, observer) = client(behavior, config(None));
        connect(&mut client);

        client.finish();

        let process = launcher.process(0);
        assert!(!process.running.load(Ordering::SeqCst));
        assert_eq!(process.terminated.load(Ordering::SeqCst), 1);
        assert_eq!(process.killed.load(Ordering::SeqCst), 0);
        assert_eq!(observer.count(&Event::Finished(None)), 1);
    }

    #[test]
    fn finish_kills_worker_ignoring_terminate() {
        let behavior = Behavior {
            honors_end: false,
            honors_terminate: false,
            ..Behavior::default()
        };
        let (mut client, launcher, _) = client(behavior, config(None));
        connect(&mut client);

        let started = Instant::now();
        client.finish();

        let process = launcher.process(0);
        assert!(!process.running.load(Ordering::SeqCst));
        assert_eq!(process.terminated.load(Ordering::SeqCst), 1);
        assert_eq!(process.killed.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < WAIT);
        assert_eq!(client.state(), ConnectionState::Finished);
    }

    #[test]
    fn silent_worker_is_restarted_once() {
        let interval = Duration::from_millis(50);
        let (mut client, launcher, observer) = client(Behavior::default(), config(Some(interval)));
        connect(&mut client);
        let first_dir = client.temp_dir().unwrap().to_path_buf();

        let started = Instant::now();
        assert!(client.run_until(|c| c.restart_count() >= 1 && c.is_connected(), WAIT));
        assert!(started.elapsed() < interval * 2 + Duration::from_millis(100));

        assert_eq!(client.restart_count(), 1);
        assert_eq!(launcher.launches(), 2);
        assert!(client.is_connected());
        assert!(!first_dir.exists());
        assert_ne!(client.temp_dir(), Some(first_dir.as_path()));
        assert_eq!(client.server().unwrap().writer().sequence(), 0);
        assert_eq!(observer.count(&Event::Restarted), 1);
        assert_eq!(observer.count(&Event::Connected), 2);
    }

    #[test]
    fn chatty_worker_is_not_restarted() {
        let behavior = Behavior {
            alive_every: Some(Duration::from_millis(10)),
            ..Behavior::default()
        };
        let (mut client, launcher, _) = client(behavior, config(Some(Duration::from_millis(50))));
        connect(&mut client);

        client.run_for(Duration::from_millis(300));

        assert_eq!(client.restart_count(), 0);
        assert_eq!(launcher.launches(), 1);
        assert!(client.handler().count(MessageTag::Alive) > 0);
    }

    #[test]
    fn manual_reset_postpones_restart() {
        let interval = Duration::from_millis(100);
        let (mut client, _, _) = client(Behavior::default(), config(Some(interval)));
        connect(&mut client);

        let deadline = Instant::now() + Duration::from_millis(300);
        while Instant::now() < deadline {
            client.reset_process_alive_timer();
            client.poll();
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(client.restart_count(), 0);
    }

    #[test]
    fn worker_exiting_before_connect_is_reported() {
        let behavior = Behavior {
            connects: false,
            exits_after: Some(Duration::ZERO),
            ..Behavior::default()
        };
        let (mut client, _, observer) = client(behavior, config(None));

        client.start().unwrap();
        let err = client.wait_for_connection(WAIT).unwrap_err();

        assert!(matches!(err, ConnectionError::WorkerExited { .. }));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.temp_dir().is_none());
        assert_eq!(observer.events(), vec![Event::Finished(None)]);
    }

    #[test]
    fn connect_timeout_stops_worker() {
        let behavior = Behavior {
            connects: false,
            ..Behavior::default()
        };
        let mut config = config(None);
        config.connect_timeout = Duration::from_millis(50);
        let (mut client, launcher, _) = client(behavior, config);

        client.start().unwrap();
        let err = client.wait_for_connection(WAIT).unwrap_err();

        assert!(matches!(
            err,
            ConnectionError::Transport(TransportError::ConnectTimeout { .. })
        ));
        let process = launcher.process(0);
        assert!(!process.running.load(Ordering::SeqCst));
        assert_eq!(process.terminated.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.take_connect_error().is_none());
    }

    #[test]
    fn start_returns_before_worker_connects() {
        let behavior = Behavior {
            connects: false,
            ..Behavior::default()
        };
        let mut config = config(Some(Duration::from_millis(20)));
        config.connect_timeout = Duration::from_secs(10);
        let (mut client, launcher, _) = client(behavior, config);

        let started = Instant::now();
        client.start().unwrap();
        client.run_for(Duration::from_millis(100));

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(client.state(), ConnectionState::Starting);
        assert_eq!(client.restart_count(), 0);
        assert_eq!(launcher.launches(), 1);
    }

    #[test]
    fn finish_while_starting_returns_promptly() {
        let behavior = Behavior {
            connects: false,
            ..Behavior::default()
        };
        let mut config = config(None);
        config.connect_timeout = Duration::from_secs(10);
        config.end_wait = Duration::from_secs(5);
        let (mut client, launcher, observer) = client(behavior, config);
        client.start().unwrap();
        client.poll();
        let temp_dir = client.temp_dir().unwrap().to_path_buf();

        let started = Instant::now();
        client.finish();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(client.state(), ConnectionState::Finished);
        let process = launcher.process(0);
        assert!(!process.running.load(Ordering::SeqCst));
        assert_eq!(process.terminated.load(Ordering::SeqCst), 1);
        assert_eq!(process.killed.load(Ordering::SeqCst), 0);
        assert!(!temp_dir.exists());
        assert_eq!(observer.events(), vec![Event::Finished(None)]);
    }

    #[test]
    fn worker_exit_is_reported() {
        let behavior = Behavior {
            exits_after: Some(Duration::from_millis(20)),
            ..Behavior::default()
        };
        let (mut client, _, observer) = client(behavior, config(None));
        connect(&mut client);

        assert!(client.run_until(
            |c| c.state() == ConnectionState::Disconnected && c.process.is_none(),
            WAIT
        ));
        assert!(client.server().is_none());
        assert_eq!(observer.count(&Event::Finished(Some(0))), 1);
        assert_eq!(observer.count(&Event::Disconnected), 1);
    }

    #[test]
    fn completion_request_gets_answer() {
        let behavior = Behavior {
            answers_completion: true,
            ..Behavior::default()
        };
        let (mut client, _, _) = client(behavior, config(None));
        connect(&mut client);

        client.server().unwrap().complete_code(CompleteCodeMessage {
            file_path: "/src/main.cpp".into(),
            ticket_number: 42,
            ..CompleteCodeMessage::default()
        });

        assert!(client.run_until(|c| c.handler().count(MessageTag::CodeCompleted) == 1, WAIT));
        match &client.handler().received[0] {
            ipcbridge_messages::ClientMessage::CodeCompleted(message) => {
                assert_eq!(message.ticket_number, 42);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn drop_finishes_worker() {
        let (mut client, launcher, observer) = client(Behavior::default(), config(None));
        connect(&mut client);

        drop(client);

        assert!(launcher.process(0).ended.load(Ordering::SeqCst));
        assert_eq!(observer.count(&Event::Finished(Some(0))), 1);
    }

    #[test]
    fn manual_restart_replaces_worker() {
        let (mut client, launcher, _) = client(Behavior::default(), config(None));
        connect(&mut client);
        client.restart().unwrap();
        client.wait_for_connection(WAIT).unwrap();
        client.restart().unwrap();
        client.wait_for_connection(WAIT).unwrap();

        assert_eq!(client.restart_count(), 2);
        assert_eq!(launcher.launches(), 3);
        assert!(launcher.process(0).ended.load(Ordering::SeqCst));
        assert!(launcher.process(1).ended.load(Ordering::SeqCst));
        assert!(client.is_connected());
    }
}
