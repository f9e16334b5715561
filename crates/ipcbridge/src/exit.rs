use std::fmt;
use std::io;

use ipcbridge_connection::ConnectionError;
use ipcbridge_frame::FrameError;
use ipcbridge_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const WORKER_ERROR: i32 = 4;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::ConnectTimeout { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::FrameTooShort { .. } | FrameError::FrameTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn connection_error(context: &str, err: ConnectionError) -> CliError {
    match err {
        ConnectionError::Transport(err) => transport_error(context, err),
        ConnectionError::Frame(err) => frame_error(context, err),
        ConnectionError::TempDir(source) => io_error(context, source),
        ConnectionError::Spawn { .. } | ConnectionError::WorkerExited { .. } => {
            CliError::new(WORKER_ERROR, format!("{context}: {err}"))
        }
        ConnectionError::NotConnected => CliError::new(TIMEOUT, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    #[test]
    fn connect_timeout_maps_to_timeout() {
        let err = ConnectionError::Transport(TransportError::ConnectTimeout {
            path: PathBuf::from("/tmp/x.sock"),
            waited: Duration::from_secs(1),
        });
        assert_eq!(connection_error("start failed", err).code, TIMEOUT);
    }

    #[test]
    fn missing_worker_binary_is_worker_error() {
        let err = ConnectionError::Spawn {
            program: PathBuf::from("/nope"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let cli = connection_error("start failed", err);
        assert_eq!(cli.code, WORKER_ERROR);
        assert!(cli.message.starts_with("start failed: failed to spawn worker /nope"));
    }

    #[test]
    fn permission_denied_is_preserved() {
        let err = TransportError::Io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(transport_error("bind", err).code, PERMISSION_DENIED);
    }
}
