//! Local socket transport for the backend connection.
//!
//! The editor side listens on a named endpoint, launches the worker with that
//! name and waits for the worker to connect back. Everything above this crate
//! only sees an [`IpcStream`]: a duplex byte stream that can be switched to
//! non-blocking mode and asked how many unread bytes are queued.

pub mod endpoint;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use endpoint::endpoint_path;
pub use error::{Result, TransportError};
pub use traits::IpcStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
