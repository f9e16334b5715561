use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use ipcbridge_transport::IpcStream;
use tracing::warn;

use crate::codec::{FrameConfig, FrameDecoder};
use crate::envelope::Envelope;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reassembles envelopes from a byte stream.
///
/// The reader never blocks waiting for the rest of a frame: [`read_all`]
/// pulls whatever the transport has ready, decodes every complete frame and
/// keeps the remainder buffered for the next call. Use it with a non-blocking
/// transport or a finite source such as a `Cursor`.
///
/// Sequence numbers are checked but not enforced. A frame whose sequence is
/// not the successor of the previous one is logged as a lost message and
/// still delivered; tracking then continues from the received value.
///
/// A decode error that follows good frames in the same batch does not cost
/// those frames: they are returned, and the error is reported by the next
/// call.
///
/// [`read_all`]: FrameReader::read_all
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    decoder: FrameDecoder,
    last_sequence: Option<i64>,
    sequence_gaps: u64,
    deferred_error: Option<FrameError>,
    closed: bool,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: FrameDecoder::new(config.max_frame_size),
            last_sequence: None,
            sequence_gaps: 0,
            deferred_error: None,
            closed: false,
            config,
        }
    }

    /// Move every byte the transport has ready into the internal buffer.
    ///
    /// Stops at `WouldBlock` or end-of-stream and returns the number of bytes
    /// read. End-of-stream is recorded and visible through [`is_closed`].
    ///
    /// [`is_closed`]: FrameReader::is_closed
    pub fn fill(&mut self) -> Result<usize> {
        let mut total = 0;
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    self.closed = true;
                    return Ok(total);
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    total += n;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(total),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Read everything available and return the envelopes completed by it.
    ///
    /// Returns an empty vector when no complete frame is buffered yet.
    pub fn read_all(&mut self) -> Result<Vec<Envelope>> {
        if let Some(err) = self.deferred_error.take() {
            return Err(err);
        }
        self.fill()?;
        let mut envelopes = Vec::new();
        loop {
            match self.next_buffered() {
                Ok(Some(envelope)) => envelopes.push(envelope),
                Ok(None) => break,
                Err(err) if envelopes.is_empty() => return Err(err),
                Err(err) => {
                    warn!(error = %err, delivered = envelopes.len(), "frame decode failed");
                    self.deferred_error = Some(err);
                    break;
                }
            }
        }
        Ok(envelopes)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> FrameReader<T> {
    /// Decode the next envelope from already buffered bytes.
    pub fn next_buffered(&mut self) -> Result<Option<Envelope>> {
        let Some(frame) = self.decoder.decode(&mut self.buf)? else {
            return Ok(None);
        };

        let expected = self.last_sequence.map_or(0, |last| last.wrapping_add(1));
        if frame.sequence != expected {
            self.sequence_gaps += 1;
            warn!(
                expected,
                received = frame.sequence,
                envelope = ?frame.envelope,
                "message lost"
            );
        }
        self.last_sequence = Some(frame.sequence);

        Ok(Some(frame.envelope))
    }

    /// Drop buffered bytes, any half-read frame and the sequence tracking.
    ///
    /// Pairs with [`FrameWriter::reset_state`](crate::FrameWriter::reset_state)
    /// after a reconnect.
    pub fn reset_state(&mut self) {
        self.discard_buffered();
        self.last_sequence = None;
        self.closed = false;
    }

    /// Drop buffered bytes and any half-read frame, keeping sequence
    /// tracking so the peer's next frame is checked against the last one.
    ///
    /// Used to resynchronize after a decode error on a live connection.
    pub fn discard_buffered(&mut self) {
        self.buf.clear();
        self.decoder.reset();
        self.deferred_error = None;
    }

    /// True once the transport reported end-of-stream.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes received but not yet decoded into an envelope.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Sequence number of the last delivered frame.
    pub fn last_sequence(&self) -> Option<i64> {
        self.last_sequence
    }

    /// Number of sequence gaps seen since the reader was created.
    pub fn sequence_gaps(&self) -> u64 {
        self.sequence_gaps
    }

    /// Update maximum frame size for subsequent decoding.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
        self.decoder.set_max_frame_size(max_frame_size);
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<IpcStream> {
    /// Create a frame reader for `IpcStream` and switch the stream to
    /// non-blocking mode so [`read_all`](FrameReader::read_all) never waits.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_nonblocking(true)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }

    /// Unread bytes in the socket plus bytes buffered but not yet decoded.
    pub fn pending_bytes(&self) -> usize {
        let queued = self.inner.bytes_available().unwrap_or(0);
        queued + self.buf.len()
    }
}

pub(crate) fn transport_to_frame_error(err: ipcbridge_transport::TransportError) -> FrameError {
    match err {
        ipcbridge_transport::TransportError::Io(io)
        | ipcbridge_transport::TransportError::Accept(io) => FrameError::Io(io),
        ipcbridge_transport::TransportError::Bind { source, .. }
        | ipcbridge_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
