use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::traits::{fallback_read_timeout, Transport};

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

/// Scriptable in-memory transport for tests and simulations.
///
/// Clones share state, so a test can hand one clone to a device session
/// and keep another to feed bytes and inspect writes.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    inbound: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    responder: Option<Responder>,
    read_limit: Option<usize>,
    read_error: Option<io::ErrorKind>,
    write_error: Option<io::ErrorKind>,
    timed_reads: usize,
}

impl FakeTransport {
    /// Create an empty fake transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fake transport with bytes already waiting to be read.
    pub fn with_inbound(bytes: &[u8]) -> Self {
        let fake = Self::new();
        fake.push_inbound(bytes);
        fake
    }

    /// Install a device simulation: called with every written buffer, its
    /// return value is queued as inbound bytes.
    pub fn with_responder<F>(self, responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
        self
    }

    /// Hand out at most `limit` bytes per read call.
    pub fn with_read_limit(self, limit: usize) -> Self {
        self.lock().read_limit = Some(limit.max(1));
        self
    }

    /// Queue bytes for the reader.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.lock().inbound.extend(bytes.iter().copied());
    }

    /// Fail the next read with `kind`.
    pub fn fail_next_read(&self, kind: io::ErrorKind) {
        self.lock().read_error = Some(kind);
    }

    /// Fail the next write with `kind`.
    pub fn fail_next_write(&self, kind: io::ErrorKind) {
        self.lock().write_error = Some(kind);
    }

    /// Every buffer written so far, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// Number of bytes still waiting to be read.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Number of timed (potentially sleeping) reads performed.
    pub fn timed_reads(&self) -> usize {
        self.lock().timed_reads
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for FakeTransport {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if let Some(kind) = state.read_error.take() {
            return Err(TransportError::Io(io::Error::from(kind)));
        }
        let limit = state.read_limit.unwrap_or(usize::MAX);
        let n = state.inbound.len().min(buf.len()).min(limit);
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.lock().timed_reads += 1;
        fallback_read_timeout(self, buf, timeout)
    }

    fn write_all_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if let Some(kind) = state.write_error.take() {
            return Err(TransportError::Io(io::Error::from(kind)));
        }
        state.writes.push(bytes.to_vec());
        if let Some(responder) = state.responder.as_mut() {
            state.inbound.extend(responder(bytes));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}

impl std::fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FakeTransport")
            .field("pending_inbound", &state.inbound.len())
            .field("writes", &state.writes.len())
            .finish()
    }
}
