//! TCP transport implementation

use super::Transport;
use crate::error::{Error, Result, is_disconnect_kind};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Poll interval while waiting for the consumer to connect
const ACCEPT_POLL_MS: u64 = 10;

/// TCP stream wrapped as a [`Transport`]
pub struct TcpTransport {
    stream: TcpStream,
    peer: String,
}

impl TcpTransport {
    /// Connect to the sensor and switch to non-blocking reads
    pub fn connect(address: &str, timeout: Duration) -> Result<Self> {
        let addr = resolve(address)?;
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| Error::Other(format!("Failed to connect to {}: {}", address, e)))?;
        stream.set_nonblocking(true)?;
        if let Err(e) = stream.set_nodelay(true) {
            log::warn!("Failed to set TCP_NODELAY on {}: {}", address, e);
        }

        log::info!("Connected to sensor at {}", addr);
        Ok(Self {
            stream,
            peer: addr.to_string(),
        })
    }

    /// Bind and wait for exactly one consumer.
    ///
    /// Returns `Ok(None)` if `running` is cleared before anyone connects.
    pub fn accept_one(
        bind_address: &str,
        write_timeout: Duration,
        running: &Arc<AtomicBool>,
    ) -> Result<Option<Self>> {
        let listener = TcpListener::bind(bind_address)
            .map_err(|e| Error::Other(format!("Failed to bind to {}: {}", bind_address, e)))?;
        listener.set_nonblocking(true)?;
        log::info!("Consumer server listening on {}", bind_address);

        while running.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    // Blocking writes with a timeout: a stalled consumer costs
                    // at most one timeout per event
                    stream.set_nonblocking(false)?;
                    stream.set_write_timeout(Some(write_timeout))?;
                    log::info!("Consumer connected: {}", addr);
                    return Ok(Some(Self {
                        stream,
                        peer: addr.to_string(),
                    }));
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(ACCEPT_POLL_MS));
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                }
            }
        }
        Ok(None)
    }

    /// Remote address
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Second handle on the same socket, for the inbound listener thread
    pub fn try_clone_stream(&self) -> Result<TcpStream> {
        Ok(self.stream.try_clone()?)
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.stream.read(buffer) {
            Ok(0) if !buffer.is_empty() => Err(Error::Disconnected(format!(
                "{} closed the connection",
                self.peer
            ))),
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(e) if is_disconnect_kind(e.kind()) => {
                Err(Error::Disconnected(format!("{}: {}", self.peer, e)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        write_whole(&mut self.stream, data, &self.peer)
    }

    fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }
}

/// Write all of `data` or report why not.
///
/// A timeout before the first byte only loses this write. A timeout after
/// part of it went out leaves a truncated packet on the wire, so the peer
/// is treated as gone.
fn write_whole<W: Write>(writer: &mut W, data: &[u8], peer: &str) -> Result<()> {
    let mut written = 0;
    while written < data.len() {
        match writer.write(&data[written..]) {
            Ok(0) => {
                return Err(Error::Disconnected(format!("{} stopped accepting data", peer)));
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if is_disconnect_kind(e.kind()) => {
                return Err(Error::Disconnected(format!("{}: {}", peer, e)));
            }
            Err(e) if written > 0 => {
                return Err(Error::Disconnected(format!(
                    "{}: {} after {} of {} bytes",
                    peer,
                    e,
                    written,
                    data.len()
                )));
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(())
}

fn resolve(address: &str) -> Result<SocketAddr> {
    address
        .to_socket_addrs()
        .map_err(|e| Error::InvalidParameter(format!("address '{}': {}", address, e)))?
        .next()
        .ok_or_else(|| Error::InvalidParameter(format!("address '{}' did not resolve", address)))
}
