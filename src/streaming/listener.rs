//! Inbound listener for consumer packets
//!
//! Runs on its own thread with blocking reads. Each read result is handed
//! to the scheduler over an unbounded channel as one packet; the listener
//! never touches detection state.
//!
//! # Shutdown
//!
//! - **Read timeout**: the stream should carry a short read timeout (500ms)
//!   so the running flag is checked between reads
//! - **Peer close**: a zero-length read ends the thread, which drops the
//!   sender and shows up at the scheduler as a disconnected channel

use crossbeam_channel::Sender;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};

/// Default size of one inbound read
pub const INBOUND_CHUNK_SIZE: usize = 4096;

/// Reads consumer packets and forwards them to the scheduler
pub struct InboundListener<R: Read> {
    stream: R,
    queue: Sender<Vec<u8>>,
    running: Arc<AtomicBool>,
    chunk_size: usize,
}

impl<R: Read + Send + 'static> InboundListener<R> {
    pub fn new(stream: R, queue: Sender<Vec<u8>>, running: Arc<AtomicBool>) -> Self {
        Self {
            stream,
            queue,
            running,
            chunk_size: INBOUND_CHUNK_SIZE,
        }
    }

    /// Run until shutdown, peer close, or the scheduler drops the queue
    pub fn run(&mut self) -> Result<()> {
        let mut buffer = vec![0u8; self.chunk_size];
        log::debug!("Inbound listener started");

        while self.running.load(Ordering::Relaxed) {
            match self.stream.read(&mut buffer) {
                Ok(0) => {
                    log::info!("Consumer closed the connection");
                    return Ok(());
                }
                Ok(n) => {
                    log::debug!("Received {} bytes from consumer", n);
                    if self.queue.send(buffer[..n].to_vec()).is_err() {
                        log::debug!("Inbound queue closed, listener exiting");
                        return Ok(());
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(e) if crate::error::is_disconnect_kind(e.kind()) => {
                    log::info!("Consumer connection lost: {}", e);
                    return Ok(());
                }
                Err(e) => {
                    log::error!("Inbound read failed: {}", e);
                    return Err(e.into());
                }
            }
        }

        log::debug!("Running flag cleared, listener exiting");
        Ok(())
    }

    /// Move the listener onto a named thread
    pub fn spawn(mut self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("consumer-listener".to_string())
            .spawn(move || {
                if let Err(e) = self.run() {
                    log::error!("Inbound listener error: {}", e);
                }
            })
            .map_err(|e| Error::Other(format!("Failed to spawn inbound listener: {}", e)))
    }
}
