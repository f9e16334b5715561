//! Supervised code-model backend connections over framed local sockets.
//!
//! An editor process launches a backend worker, hands it a private endpoint
//! and talks to it with typed messages in length-prefixed envelopes. The
//! editor side restarts a worker that stops answering.
//!
//! # Crate Structure
//!
//! - [`transport`]: local socket transport and endpoint naming
//! - [`frame`]: envelope framing with sequence tracking
//! - [`messages`]: the message registry, handler traits, proxies and fan-out
//! - [`connection`]: editor-side supervisor and worker-side event loop
//!   (behind the `connection` feature)
//! - [`demo`]: an in-memory backend served by `ipcbridge-backend`

pub mod demo;

#[cfg(feature = "cli")]
pub mod logging;

/// Re-export transport types.
pub mod transport {
    pub use ipcbridge_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ipcbridge_frame::*;
}

/// Re-export message types.
pub mod messages {
    pub use ipcbridge_messages::*;
}

/// Re-export connection types (requires `connection` feature).
#[cfg(feature = "connection")]
pub mod connection {
    pub use ipcbridge_connection::*;
}
