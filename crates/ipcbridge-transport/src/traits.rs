use std::io::{Read, Write};

use crate::error::Result;

/// A connected local stream — implements Read + Write.
///
/// This is the byte stream the frame layer sits on. On Unix it wraps a Unix
/// domain socket stream.
pub struct IpcStream {
    inner: IpcStreamInner,
}

enum IpcStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl IpcStream {
    /// Wrap an already connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: IpcStreamInner::Unix(stream),
        }
    }

    /// Create a connected pair of streams without touching the filesystem.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Switch the stream between blocking and non-blocking mode.
    ///
    /// The mode is shared with every clone of this stream.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_nonblocking(nonblocking).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_unix(cloned))
            }
        }
    }

    /// Close both directions of the stream.
    ///
    /// The peer observes end-of-stream on its next read.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => match stream.shutdown(std::net::Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(err.into()),
            },
        }
    }

    /// Number of received bytes queued in the socket and not yet read.
    #[cfg(unix)]
    pub fn bytes_available(&self) -> Result<usize> {
        use std::os::fd::AsRawFd;

        let fd = match &self.inner {
            IpcStreamInner::Unix(stream) => stream.as_raw_fd(),
        };

        let mut available: libc::c_int = 0;

        // SAFETY: `available` is a valid writable c_int as FIONREAD expects,
        // and `fd` is an open socket descriptor owned by this stream.
        let rc = unsafe { libc::ioctl(fd, libc::FIONREAD, &mut available as *mut libc::c_int) };

        if rc == 0 {
            Ok(available.max(0) as usize)
        } else {
            Err(std::io::Error::last_os_error().into())
        }
    }

    /// Number of received bytes queued in the stream and not yet read.
    ///
    /// Always zero on platforms without a queue probe.
    #[cfg(not(unix))]
    pub fn bytes_available(&self) -> Result<usize> {
        Ok(0)
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(_) => f.debug_struct("IpcStream").field("type", &"unix").finish(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::ErrorKind;

    use super::*;

    #[test]
    fn bytes_available_counts_unread_bytes() {
        let (mut left, right) = IpcStream::pair().unwrap();
        assert_eq!(right.bytes_available().unwrap(), 0);

        left.write_all(b"hello").unwrap();
        left.flush().unwrap();

        assert_eq!(right.bytes_available().unwrap(), 5);
    }

    #[test]
    fn nonblocking_read_reports_would_block() {
        let (_left, mut right) = IpcStream::pair().unwrap();
        right.set_nonblocking(true).unwrap();

        let mut buf = [0u8; 4];
        let err = right.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn shutdown_signals_end_of_stream() {
        let (left, mut right) = IpcStream::pair().unwrap();
        left.shutdown().unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(right.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn clone_shares_connection() {
        let (left, mut right) = IpcStream::pair().unwrap();
        let mut writer = left.try_clone().unwrap();
        writer.write_all(b"x").unwrap();

        let mut buf = [0u8; 1];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"x");
        drop(left);
    }
}
