//! Mock transport for testing

use super::Transport;
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory transport; clones share the same buffers
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    /// Packets in write order, one entry per `write_all`
    writes: Vec<Vec<u8>>,
    write_error: Option<ErrorKind>,
    closed: bool,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.lock().read_buffer.extend(data);
    }

    /// Get all written data
    pub fn get_written(&self) -> Vec<u8> {
        self.lock().write_buffer.clone()
    }

    /// Written buffers, one per `write_all` call
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// Clear written data
    pub fn clear_written(&self) {
        let mut inner = self.lock();
        inner.write_buffer.clear();
        inner.writes.clear();
    }

    /// Make subsequent writes fail with `kind` (`None` to recover)
    pub fn fail_writes(&self, kind: Option<ErrorKind>) {
        self.lock().write_error = kind;
    }

    /// Simulate the peer closing once buffered data is drained
    pub fn close(&self) {
        self.lock().closed = true;
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.lock();
        if inner.read_buffer.is_empty() && inner.closed {
            return Err(Error::Disconnected("mock peer closed".to_string()));
        }

        let available = inner.read_buffer.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(inner.read_buffer.drain(..available)) {
            *slot = byte;
        }
        Ok(available)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if let Some(kind) = inner.write_error {
            return Err(Error::Io(std::io::Error::from(kind)));
        }
        inner.write_buffer.extend_from_slice(data);
        inner.writes.push(data.to_vec());
        Ok(())
    }
}
