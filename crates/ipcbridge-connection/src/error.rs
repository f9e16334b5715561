use std::path::PathBuf;

use ipcbridge_frame::FrameError;
use ipcbridge_transport::TransportError;

/// Errors surfaced by connection setup.
///
/// Protocol problems on an established connection are logged, not returned.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Socket setup failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Frame reader or writer setup failed.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The per-run worker temp directory could not be created.
    #[error("failed to create worker temp dir: {0}")]
    TempDir(std::io::Error),

    /// The worker program could not be started.
    #[error("failed to spawn worker {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// The worker exited before it connected back.
    #[error("worker exited before connecting (exit code {code:?})")]
    WorkerExited { code: Option<i32> },

    /// No worker connected, and none is being started.
    #[error("worker is not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
