//! Typed messages of the code-model protocol.
//!
//! Every message type has exactly one [`MessageTag`]. On receipt an
//! [`Envelope`](ipcbridge_frame::Envelope) is decoded once into
//! [`ServerMessage`] or [`ClientMessage`] and dispatched to a
//! [`CodeModelServer`] or [`CodeModelClient`] through an exhaustive match.
//! Tags outside the registry are logged and dropped so a newer peer never
//! breaks the connection.
//!
//! The proxies implement the handler traits by writing frames, so the same
//! trait is used on both ends of the wire.

pub mod client;
pub mod error;
pub mod messages;
pub mod server;
pub mod tag;
pub mod types;

pub use client::{
    dispatch_client_envelope, ClientDispatcher, ClientHandle, ClientMessage, ClientProxy,
    CodeModelClient,
};
pub use error::{MessageError, Result};
pub use messages::*;
pub use server::{
    dispatch_server_envelope, BackendServer, CodeModelServer, ServerMessage, ServerProxy,
};
pub use tag::{Direction, MessageTag};
pub use types::*;
