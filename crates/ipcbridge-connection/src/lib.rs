//! Both ends of a supervised backend connection.
//!
//! The editor side ([`ConnectionClient`]) creates a private temp directory,
//! listens on an endpoint inside it, launches the worker and waits for it to
//! connect back. It then watches the worker with an alive timer and restarts
//! it when it stops answering. The worker side ([`ConnectionServer`])
//! connects to that endpoint, dispatches requests to a backend and sends
//! periodic alive messages.
//!
//! Both sides are single-threaded: the owner drives them by polling.

pub mod config;
pub mod error;
pub mod line_prefixer;
pub mod process;
pub mod timer;

#[cfg(unix)]
pub mod client;
#[cfg(unix)]
pub mod server;

#[cfg(all(test, unix))]
mod testing;

pub use config::{
    ClientConfig, ServerConfig, ALIVE_INTERVAL_ENV, CONNECT_TIMEOUT_ENV, DEFAULT_COMPONENT,
    NO_ALIVE_TIMER_ENV,
};
pub use error::{ConnectionError, Result};
pub use line_prefixer::LinePrefixer;
pub use process::{ChildProcess, CommandLauncher, WorkerCommand, WorkerLauncher, WorkerProcess};
pub use timer::AliveTimer;

#[cfg(unix)]
pub use client::{ConnectionClient, ConnectionObserver, ConnectionState};
#[cfg(unix)]
pub use server::{ConnectionServer, ServerStatus};
