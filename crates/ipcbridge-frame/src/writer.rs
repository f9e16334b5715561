use std::io::{ErrorKind, Write};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use ipcbridge_transport::IpcStream;
use tracing::{trace, warn};

use crate::codec::{encode_frame, FrameConfig};
use crate::envelope::Envelope;
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const WOULD_BLOCK_BACKOFF: Duration = Duration::from_millis(1);

/// Writes numbered envelope frames to any `Write` stream.
///
/// Each frame carries the writer's current sequence number, which then
/// advances by one. The number advances even when the transport rejects the
/// bytes, so the peer sees a gap where the frame was lost.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    sequence: i64,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            sequence: 0,
            config,
        }
    }

    /// Send one envelope, logging instead of returning a failure.
    ///
    /// Senders of envelopes do not wait for or learn about delivery.
    pub fn write(&mut self, envelope: &Envelope) {
        if let Err(err) = self.try_write(envelope) {
            warn!(
                tag = envelope.tag(),
                sequence = self.sequence.wrapping_sub(1),
                error = %err,
                "failed to write envelope"
            );
        }
    }

    /// Encode and send one envelope.
    ///
    /// A write that keeps hitting `WouldBlock` is retried until the configured
    /// write timeout elapses.
    pub fn try_write(&mut self, envelope: &Envelope) -> Result<()> {
        self.buf.clear();
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        let result = self.encode_and_send(sequence, envelope);
        self.buf.clear();
        if result.is_ok() {
            trace!(tag = envelope.tag(), sequence, "wrote envelope");
        }
        result
    }

    fn encode_and_send(&mut self, sequence: i64, envelope: &Envelope) -> Result<()> {
        encode_frame(sequence, envelope, self.config.max_frame_size, &mut self.buf)?;
        self.send_buffered()?;
        self.flush()
    }

    fn send_buffered(&mut self) -> Result<()> {
        let started = Instant::now();
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    self.wait_writable(started)?;
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    fn wait_writable(&self, started: Instant) -> Result<()> {
        if let Some(timeout) = self.config.write_timeout {
            if started.elapsed() >= timeout {
                return Err(FrameError::Io(std::io::Error::new(
                    ErrorKind::TimedOut,
                    "transport stayed full past the write timeout",
                )));
            }
        }
        std::thread::sleep(WOULD_BLOCK_BACKOFF);
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        let started = Instant::now();
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    self.wait_writable(started)?;
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> FrameWriter<T> {
    /// Sequence number the next frame will carry.
    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Restart numbering at zero, as after a reconnect.
    pub fn reset_state(&mut self) {
        self.sequence = 0;
        self.buf.clear();
    }

    /// Update maximum frame size for subsequent encoding.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<IpcStream> {
    /// Create a frame writer for `IpcStream` and apply write timeout from config.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
