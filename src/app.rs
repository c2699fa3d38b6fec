//! Application orchestration for the Drishti daemon
//!
//! Connects the sensor, waits for the consumer, then drives the protocol
//! session from a single cooperative scheduler until shutdown or disconnect.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::streaming::{InboundListener, ProtocolSession};
use crate::transport::{TcpTransport, Transport};
use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Read timeout on the listener's socket so it notices shutdown
const LISTENER_READ_TIMEOUT_MS: u64 = 500;

/// Cadences of the scheduler's periodic tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub sensor_poll: Duration,
    pub queue_drain: Duration,
    /// `None` disables the statistics line
    pub stats: Option<Duration>,
}

impl Cadence {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sensor_poll: Duration::from_millis(config.radar.update_ms),
            queue_drain: Duration::from_millis(config.protocol.queue_drain_ms),
            stats: (config.logging.stats_interval_s > 0)
                .then(|| Duration::from_secs(config.logging.stats_interval_s)),
        }
    }
}

/// Single-threaded timer loop owning the session
pub struct Scheduler<S: Transport, C: Transport> {
    session: ProtocolSession<S, C>,
    inbound: Receiver<Vec<u8>>,
    running: Arc<AtomicBool>,
    cadence: Cadence,
    next_poll: Instant,
    next_drain: Instant,
    next_stats: Instant,
    frames_at_last_stats: u64,
}

impl<S: Transport, C: Transport> Scheduler<S, C> {
    pub fn new(
        session: ProtocolSession<S, C>,
        inbound: Receiver<Vec<u8>>,
        running: Arc<AtomicBool>,
        cadence: Cadence,
    ) -> Self {
        let now = Instant::now();
        Self {
            session,
            inbound,
            running,
            cadence,
            next_poll: now,
            next_drain: now,
            next_stats: now + cadence.stats.unwrap_or_default(),
            frames_at_last_stats: 0,
        }
    }

    /// Run due tasks until shutdown; returns the error that stopped the loop
    pub fn run(&mut self) -> Result<()> {
        info!(
            "Scheduler running: sensor every {:?}, inbound queue every {:?}",
            self.cadence.sensor_poll, self.cadence.queue_drain
        );

        while self.running.load(Ordering::Relaxed) {
            let now = Instant::now();
            self.tick(now)?;

            let wake = self.next_poll.min(self.next_drain);
            let now = Instant::now();
            if wake > now {
                std::thread::sleep(wake - now);
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Run whichever tasks are due at `now`
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        if now >= self.next_poll {
            self.next_poll = now + self.cadence.sensor_poll;
            if let Err(e) = self.session.poll_sensor() {
                if e.is_disconnect() {
                    error!("Sensor connection lost: {}", e);
                    return Err(e);
                }
                error!("Sensor poll failed: {}", e);
            }
        }

        if now >= self.next_drain {
            self.next_drain = now + self.cadence.queue_drain;
            self.drain_inbound()?;
        }

        if let Some(period) = self.cadence.stats
            && now >= self.next_stats
        {
            self.log_stats(period);
            self.next_stats = now + period;
        }
        Ok(())
    }

    /// Handle every packet queued since the last drain
    fn drain_inbound(&mut self) -> Result<()> {
        loop {
            match self.inbound.try_recv() {
                Ok(raw) => match self.session.handle_inbound(&raw) {
                    Ok(outcome) => debug!("Inbound outcome: {:?}", outcome),
                    Err(e) if e.is_disconnect() => {
                        error!("Connection lost while answering consumer: {}", e);
                        return Err(e);
                    }
                    Err(e) => error!("Failed to answer consumer: {}", e),
                },
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    return Err(Error::Disconnected(
                        "consumer listener stopped".to_string(),
                    ));
                }
            }
        }
    }

    fn log_stats(&mut self, period: Duration) {
        info!("{}", self.stats_line(period));
    }

    /// One-line summary of the last `period`; resets the frame-rate window
    pub fn stats_line(&mut self, period: Duration) -> String {
        let stats = self.session.stats();
        let frames = stats.frames_decoded - self.frames_at_last_stats;
        self.frames_at_last_stats = stats.frames_decoded;
        let summary = self.session.engine().last_summary();

        format!(
            "{:.1} frames/s | min {} mm | max {} mm | {} zone hits | {}/{} zones occupied | {} events sent, {} dropped",
            frames as f64 / period.as_secs_f64(),
            stats.last_min_mm.map_or_else(|| "-".to_string(), |d| d.to_string()),
            stats.last_max_mm.map_or_else(|| "-".to_string(), |d| d.to_string()),
            summary.hits,
            summary.occupied,
            self.session.engine().zone_count(),
            stats.transitions_sent,
            stats.events_dropped
        )
    }

    pub fn session(&self) -> &ProtocolSession<S, C> {
        &self.session
    }
}

/// Daemon wiring: sockets, listener thread and scheduler
pub struct DetectorApp {
    config: Config,
    running: Arc<AtomicBool>,
}

impl DetectorApp {
    pub fn new(config: Config, running: Arc<AtomicBool>) -> Self {
        Self { config, running }
    }

    /// Run until Ctrl-C or until either peer disconnects
    pub fn run(&self) -> Result<()> {
        let config = &self.config;

        info!("Connecting to sensor at {}", config.sensor.address);
        let sensor = TcpTransport::connect(
            &config.sensor.address,
            Duration::from_millis(config.sensor.connect_timeout_ms),
        )?;

        let Some(consumer) = TcpTransport::accept_one(
            &config.server.bind_address,
            Duration::from_millis(config.server.write_timeout_ms),
            &self.running,
        )?
        else {
            info!("Shutdown requested before a consumer connected");
            return Ok(());
        };
        let peer = consumer.peer().to_string();

        let listener_stream = consumer.try_clone_stream()?;
        listener_stream.set_read_timeout(Some(Duration::from_millis(LISTENER_READ_TIMEOUT_MS)))?;
        let shutdown_stream = consumer.try_clone_stream()?;

        let mut session = ProtocolSession::from_config(config, sensor, consumer)?;
        session.arm_sensor()?;
        info!(
            "Monitoring {} zone(s), reporting to {}",
            session.engine().zone_count(),
            peer
        );

        let (tx, rx) = crossbeam_channel::unbounded();
        let listener =
            InboundListener::new(listener_stream, tx, Arc::clone(&self.running)).spawn()?;

        let mut scheduler = Scheduler::new(
            session,
            rx,
            Arc::clone(&self.running),
            Cadence::from_config(config),
        );
        let result = scheduler.run();

        self.running.store(false, Ordering::Relaxed);
        let _ = shutdown_stream.shutdown(std::net::Shutdown::Both);
        if listener.join().is_err() {
            error!("Inbound listener thread panicked");
        }

        let stats = scheduler.session().stats();
        info!(
            "Session ended: {} frames, {} events sent, {} acknowledgements, {} CRC failures",
            stats.frames_decoded, stats.transitions_sent, stats.acks_sent, stats.crc_failures
        );
        result
    }
}
