use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes, BytesMut};
use kegboard_frame::{validate_frame, FrameAssembler, FrameConfig};
use kegboard_message::{Message, MessageError, Registry};
use kegboard_transport::{DeviceStream, Transport};
use tracing::{debug, info, trace, warn};

use crate::error::{DeviceError, Result};

/// Default number of bytes requested from the transport per read.
pub const DEFAULT_READ_CHUNK: usize = 64;

/// Default wait between polls in [`Device::read`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared handle to a message registry.
pub type RegistryHandle = Arc<Registry>;

/// Configuration for a device session.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Frame assembly and validation limits.
    pub frame: FrameConfig,
    /// Bytes requested from the transport per read call. Default: 64.
    pub read_chunk_size: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            read_chunk_size: DEFAULT_READ_CHUNK,
        }
    }
}

/// A session with one kegboard.
///
/// The session starts closed. [`Device::open`] or [`Device::attach`] give it
/// a transport; [`Device::close`] releases the transport and forgets any
/// partially received frame.
pub struct Device {
    transport: Option<Box<dyn Transport + Send>>,
    assembler: FrameAssembler,
    pending: BytesMut,
    registry: RegistryHandle,
    config: DeviceConfig,
    path: Option<PathBuf>,
    speed: Option<u32>,
}

impl Device {
    /// Create a closed session with default configuration.
    pub fn new() -> Self {
        Self::with_config(DeviceConfig::default())
    }

    /// Create a closed session with explicit configuration.
    pub fn with_config(config: DeviceConfig) -> Self {
        Self {
            transport: None,
            assembler: FrameAssembler::with_config(&config.frame),
            pending: BytesMut::new(),
            registry: Arc::new(Registry::builtin()),
            config,
            path: None,
            speed: None,
        }
    }

    /// Decode incoming frames with `registry` instead of the built-in one.
    pub fn with_registry(mut self, registry: RegistryHandle) -> Self {
        self.registry = registry;
        self
    }

    /// Open the device at `path`.
    ///
    /// A regular file is replayed read-only; anything else is opened as a
    /// serial port at `speed` baud.
    pub fn open(&mut self, path: impl AsRef<Path>, speed: u32) -> Result<()> {
        if self.is_open() {
            return Err(DeviceError::AlreadyOpen);
        }
        let stream = DeviceStream::open(path.as_ref(), speed)?;
        self.attach(stream)?;
        self.path = Some(path.as_ref().to_path_buf());
        self.speed = Some(speed);
        Ok(())
    }

    /// Open the session over a caller-provided transport.
    pub fn attach<T>(&mut self, transport: T) -> Result<()>
    where
        T: Transport + Send + 'static,
    {
        if self.is_open() {
            return Err(DeviceError::AlreadyOpen);
        }
        info!(transport = %transport.describe(), "device opened");
        self.reset_stream();
        self.transport = Some(Box::new(transport));
        Ok(())
    }

    /// Release the transport and drop any partially received frame.
    pub fn close(&mut self) -> Result<()> {
        let transport = self.transport.take().ok_or(DeviceError::NotOpen)?;
        info!(transport = %transport.describe(), "device closed");
        drop(transport);
        self.reset_stream();
        self.path = None;
        self.speed = None;
        Ok(())
    }

    /// Like [`Device::close`], but a session that is not open is not an error.
    pub fn close_quietly(&mut self) {
        if let Err(err) = self.close() {
            trace!(%err, "close ignored");
        }
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Path given to [`Device::open`], while open.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Return the next complete message without waiting.
    ///
    /// Pulls whatever the transport has ready into the assembler. Frames that
    /// fail validation, carry an unknown message type or cannot be decoded
    /// are dropped. Bytes past the returned message stay buffered for the
    /// next call.
    pub fn read_nonblocking(&mut self) -> Result<Option<Message>> {
        self.ensure_open()?;
        loop {
            if let Some(message) = self.process_pending() {
                return Ok(Some(message));
            }
            if self.pull(None)? == 0 {
                return Ok(None);
            }
        }
    }

    /// Return every message available right now, in arrival order.
    pub fn drain(&mut self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        while let Some(message) = self.read_nonblocking()? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Wait for the next message.
    ///
    /// Gives up after `timeout`, or never when `timeout` is `None`. Between
    /// polls the transport's timed read waits at most `poll_interval`.
    pub fn read(
        &mut self,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Result<Option<Message>> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        loop {
            if let Some(message) = self.read_nonblocking()? {
                return Ok(Some(message));
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    poll_interval.min(deadline - now)
                }
                None => poll_interval,
            };
            self.pull(Some(wait))?;
        }
    }

    /// Encode and send `message`.
    pub fn write(&mut self, message: &Message) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(DeviceError::NotOpen)?;
        let wire = message.to_frame_bytes()?;
        transport.write_all_bytes(&wire)?;
        debug!(%message, len = wire.len(), "sent message");
        Ok(())
    }

    /// Send a ping. A live board answers with a hello report.
    pub fn ping(&mut self) -> Result<()> {
        self.write(&Message::ping())
    }

    /// Switch output `output_id` on or off.
    pub fn set_output(&mut self, output_id: u8, enabled: bool) -> Result<()> {
        self.write(&Message::set_output(output_id, u8::from(enabled)))
    }

    /// Store a new serial number on the board.
    pub fn set_serial_number(&mut self, serial_number: &str) -> Result<()> {
        self.ensure_open()?;
        self.write(&Message::set_serial_number(serial_number)?)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DeviceError::NotOpen)
        }
    }

    fn reset_stream(&mut self) {
        self.assembler.reset();
        self.pending.clear();
    }

    /// Move one read's worth of transport bytes into the pending buffer.
    fn pull(&mut self, wait: Option<Duration>) -> Result<usize> {
        let transport = self.transport.as_mut().ok_or(DeviceError::NotOpen)?;
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];
        let read = match wait {
            Some(wait) => transport.read_timeout(&mut chunk, wait)?,
            None => transport.read_available(&mut chunk)?,
        };
        if read > 0 {
            trace!(read, "received bytes");
            self.pending.extend_from_slice(&chunk[..read]);
        }
        Ok(read)
    }

    /// Feed pending bytes to the assembler until a message comes out.
    fn process_pending(&mut self) -> Option<Message> {
        while self.pending.has_remaining() {
            let byte = self.pending.get_u8();
            if let Some(raw) = self.assembler.push(byte) {
                if let Some(message) = self.accept(raw) {
                    return Some(message);
                }
            }
        }
        None
    }

    fn accept(&self, raw: Bytes) -> Option<Message> {
        let frame = match validate_frame(raw, &self.config.frame) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(%err, "dropping invalid frame");
                return None;
            }
        };
        match self.registry.decode(&frame) {
            Ok(message) => {
                trace!(%message, "received message");
                Some(message)
            }
            Err(MessageError::UnknownMessage(id)) => {
                debug!(message_id = id, "dropping unknown message type");
                None
            }
            Err(err) => {
                warn!(message_id = frame.message_id, %err, "dropping malformed message");
                None
            }
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.transport, &self.path, self.speed) {
            (Some(_), Some(path), Some(speed)) => {
                write!(f, "<Device path={} speed={speed}>", path.display())
            }
            (Some(transport), _, _) => write!(f, "<Device {}>", transport.describe()),
            (None, _, _) => f.write_str("<Device closed>"),
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("open", &self.is_open())
            .field("path", &self.path)
            .field("speed", &self.speed)
            .field("buffered", &(self.pending.len() + self.assembler.buffered_len()))
            .finish()
    }
}
