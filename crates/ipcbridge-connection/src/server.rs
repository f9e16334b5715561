use std::path::{Path, PathBuf};
use std::time::Instant;

use ipcbridge_frame::{FrameReader, FrameWriter};
use ipcbridge_messages::{
    dispatch_server_envelope, BackendServer, ClientHandle, ClientProxy, CodeModelClient, MessageTag,
};
use ipcbridge_transport::{IpcStream, UnixDomainSocket};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::timer::AliveTimer;

/// Whether a [`ConnectionServer`] should keep polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Running,
    /// The editor sent `End` or closed the connection.
    Stopped,
}

/// Worker-side event loop: connects back to the editor, feeds incoming
/// messages to a [`BackendServer`] and keeps the editor's alive timer fed.
///
/// The editor connection is registered with the backend's
/// [`ClientDispatcher`](ipcbridge_messages::ClientDispatcher), so replies the
/// backend sends there go out on the socket.
pub struct ConnectionServer<S> {
    server: S,
    config: ServerConfig,
    endpoint: Option<PathBuf>,
    reader: Option<FrameReader<IpcStream>>,
    client: Option<ClientHandle>,
    alive_timer: AliveTimer,
    status: ServerStatus,
}

impl<S: BackendServer> ConnectionServer<S> {
    pub fn new(server: S, config: ServerConfig) -> Self {
        let alive_timer = AliveTimer::new(config.alive_interval);
        Self {
            server,
            config,
            endpoint: None,
            reader: None,
            client: None,
            alive_timer,
            status: ServerStatus::Stopped,
        }
    }

    /// Connect to the editor listening on `endpoint`.
    ///
    /// The editor may not be listening yet; connecting is retried until
    /// `connect_timeout`.
    pub fn connect(&mut self, endpoint: impl AsRef<Path>) -> Result<()> {
        let endpoint = endpoint.as_ref();
        let stream = UnixDomainSocket::connect_with_retry(
            endpoint,
            self.config.connect_timeout,
            self.config.connect_retry_interval,
        )?;

        let reader = FrameReader::with_config_ipc(stream.try_clone()?, self.config.frame.clone())?;
        let writer = FrameWriter::with_config_ipc(stream, self.config.frame.clone())?;
        let handle = self
            .server
            .client_dispatcher()
            .add_client(Box::new(ClientProxy::new(writer)));

        self.reader = Some(reader);
        self.client = Some(handle);
        self.endpoint = Some(endpoint.to_path_buf());
        self.status = ServerStatus::Running;
        self.alive_timer.start(Instant::now());
        info!(?endpoint, "connected to editor");
        Ok(())
    }

    /// Run one turn of the event loop.
    pub fn poll(&mut self) -> ServerStatus {
        if self.status == ServerStatus::Stopped {
            return ServerStatus::Stopped;
        }

        self.read_messages();

        if self.status == ServerStatus::Running && self.alive_timer.poll(Instant::now()) {
            self.server.client_dispatcher().alive();
        }
        self.status
    }

    fn read_messages(&mut self) {
        let Some(reader) = self.reader.as_mut() else {
            self.status = ServerStatus::Stopped;
            return;
        };

        let envelopes = match reader.read_all() {
            Ok(envelopes) => envelopes,
            Err(err) => {
                warn!(error = %err, "failed to read from editor");
                reader.discard_buffered();
                Vec::new()
            }
        };
        let closed = reader.is_closed();

        let mut ended = false;
        for envelope in &envelopes {
            dispatch_server_envelope(&mut self.server, envelope);
            if envelope.tag() == MessageTag::End.value() {
                ended = true;
                break;
            }
        }

        if ended {
            debug!("end received");
            self.stop();
        } else if closed {
            debug!("editor closed the connection");
            self.stop();
        }
    }

    /// Poll until the editor ends the session.
    pub fn run(&mut self) {
        while self.poll() == ServerStatus::Running {
            std::thread::sleep(self.config.poll_interval);
        }
    }

    /// Drop the editor connection.
    pub fn stop(&mut self) {
        self.alive_timer.stop();
        if let Some(handle) = self.client.take() {
            self.server.client_dispatcher().remove_client(handle);
        }
        if let Some(reader) = self.reader.take() {
            if let Err(err) = reader.get_ref().shutdown() {
                debug!(error = %err, "socket shutdown failed");
            }
        }
        if self.status == ServerStatus::Running {
            info!(endpoint = ?self.endpoint, "disconnected from editor");
        }
        self.status = ServerStatus::Stopped;
    }
}

impl<S> ConnectionServer<S> {
    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn endpoint(&self) -> Option<&Path> {
        self.endpoint.as_deref()
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut S {
        &mut self.server
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The backend, after the connection is dropped.
    pub fn into_inner(self) -> S {
        self.server
    }
}
