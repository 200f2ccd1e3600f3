use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Default serial speed for kegboard firmware.
pub const DEFAULT_SPEED: u32 = 115_200;

/// Driver-level timeout applied when a serial port is opened.
const OPEN_TIMEOUT: Duration = Duration::from_millis(100);

/// A byte pipe to a kegboard.
///
/// Reads never block unless the method says so. Implementations that have
/// no native timed read keep the default [`Transport::read_timeout`], which
/// sleeps and then polls once.
pub trait Transport {
    /// Read whatever bytes are available right now. Returns 0 when none are.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Wait up to `timeout` for bytes, then read what is available.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        fallback_read_timeout(self, buf, timeout)
    }

    /// Write every byte and flush.
    fn write_all_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String {
        "transport".to_string()
    }
}

/// Sleep-poll rendition of a timed read, for transports without one.
pub fn fallback_read_timeout<T: Transport + ?Sized>(
    transport: &mut T,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<usize> {
    let read = transport.read_available(buf)?;
    if read > 0 || timeout.is_zero() {
        return Ok(read);
    }
    std::thread::sleep(timeout);
    transport.read_available(buf)
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_available(buf)
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read_timeout(buf, timeout)
    }

    fn write_all_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all_bytes(bytes)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// An open kegboard connection: a serial port, or a capture file replayed
/// read-only.
pub struct DeviceStream {
    inner: DeviceStreamInner,
    path: PathBuf,
}

enum DeviceStreamInner {
    Serial(Box<dyn SerialPort>),
    Replay(File),
}

impl DeviceStream {
    /// Open `path` at `speed` baud.
    ///
    /// A path naming a regular file is opened as a capture replay and `speed`
    /// is ignored. Anything else is opened as a serial port and its pending
    /// input is discarded.
    pub fn open(path: impl AsRef<Path>, speed: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.is_file() {
            let file = File::open(&path).map_err(|source| TransportError::OpenFile {
                path: path.clone(),
                source,
            })?;
            info!(?path, "replaying capture file");
            return Ok(Self {
                inner: DeviceStreamInner::Replay(file),
                path,
            });
        }

        let port = serialport::new(path.to_string_lossy(), speed)
            .timeout(OPEN_TIMEOUT)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                speed,
                source,
            })?;
        port.clear(ClearBuffer::Input)?;
        info!(?path, speed, "opened serial port");

        Ok(Self {
            inner: DeviceStreamInner::Serial(port),
            path,
        })
    }

    /// The path this stream was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self.inner {
            DeviceStreamInner::Serial(_) => "serial",
            DeviceStreamInner::Replay(_) => "replay",
        }
    }
}

impl Transport for DeviceStream {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match &mut self.inner {
            DeviceStreamInner::Serial(port) => {
                let waiting = port.bytes_to_read()? as usize;
                if waiting == 0 {
                    return Ok(0);
                }
                let want = waiting.min(buf.len());
                read_quiet(port.as_mut(), &mut buf[..want])
            }
            DeviceStreamInner::Replay(file) => read_quiet(file, buf),
        }
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if timeout.is_zero() {
            return self.read_available(buf);
        }
        match &mut self.inner {
            DeviceStreamInner::Serial(port) => {
                port.set_timeout(timeout)?;
                return read_quiet(port.as_mut(), buf);
            }
            DeviceStreamInner::Replay(_) => {}
        }
        fallback_read_timeout(self, buf, timeout)
    }

    fn write_all_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.inner {
            DeviceStreamInner::Serial(port) => {
                port.write_all(bytes)?;
                port.flush()?;
                debug!(len = bytes.len(), "wrote bytes");
                Ok(())
            }
            DeviceStreamInner::Replay(_) => Err(TransportError::ReadOnly {
                path: self.path.clone(),
            }),
        }
    }

    fn describe(&self) -> String {
        format!("{} {}", self.transport_name(), self.path.display())
    }
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStream")
            .field("type", &self.transport_name())
            .field("path", &self.path)
            .finish()
    }
}

/// Read once, treating "nothing arrived in time" as zero bytes.
fn read_quiet<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    match reader.read(buf) {
        Ok(n) => Ok(n),
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
            ) =>
        {
            Ok(0)
        }
        Err(err) => Err(TransportError::Io(err)),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::time::Instant;

    use super::*;

    #[test]
    fn open_regular_file_replays_contents() {
        let mut capture = tempfile::NamedTempFile::new().unwrap();
        capture.write_all(b"captured").unwrap();

        let mut stream = DeviceStream::open(capture.path(), DEFAULT_SPEED).unwrap();
        assert_eq!(stream.transport_name(), "replay");

        let mut buf = [0u8; 32];
        let n = stream.read_available(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"captured");
        assert_eq!(stream.read_available(&mut buf).unwrap(), 0);
    }

    #[test]
    fn replay_rejects_writes() {
        let capture = tempfile::NamedTempFile::new().unwrap();
        let mut stream = DeviceStream::open(capture.path(), DEFAULT_SPEED).unwrap();

        let err = stream.write_all_bytes(b"x").unwrap_err();
        assert!(matches!(err, TransportError::ReadOnly { .. }));
    }

    #[test]
    fn replay_timed_read_falls_back_to_sleep() {
        let capture = tempfile::NamedTempFile::new().unwrap();
        let mut stream = DeviceStream::open(capture.path(), DEFAULT_SPEED).unwrap();

        let start = Instant::now();
        let mut buf = [0u8; 8];
        let n = stream
            .read_timeout(&mut buf, Duration::from_millis(20))
            .unwrap();
        assert_eq!(n, 0);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn open_missing_serial_port_fails() {
        let err = DeviceStream::open("/dev/kegboard-does-not-exist", DEFAULT_SPEED).unwrap_err();
        assert!(matches!(err, TransportError::Open { speed: DEFAULT_SPEED, .. }));
    }

    #[test]
    fn describe_names_transport_and_path() {
        let capture = tempfile::NamedTempFile::new().unwrap();
        let stream = DeviceStream::open(capture.path(), DEFAULT_SPEED).unwrap();
        let description = stream.describe();
        assert!(description.starts_with("replay "));
        assert!(description.ends_with(&capture.path().display().to_string()));
    }
}
