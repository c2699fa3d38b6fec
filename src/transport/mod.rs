//! Transport layer for I/O abstraction

use crate::error::Result;

mod mock;
mod tcp;

pub use mock::MockTransport;
pub use tcp::TcpTransport;

/// Byte-stream connection to the sensor or the consumer
pub trait Transport: Send {
    /// Read available data into buffer.
    ///
    /// Returns `Ok(0)` when nothing is available yet (would-block or
    /// timeout). A peer that closed the connection is an error, never `Ok(0)`.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write the whole buffer
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Flush any pending writes
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
