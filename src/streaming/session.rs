//! Protocol session: the single owner of all detection state.
//!
//! Sensor bytes flow through the synchronizer, decoder and zone engine, and
//! the resulting transitions leave as zone-event packets. Consumer packets
//! come back in through [`ProtocolSession::handle_inbound`], which answers
//! with an acknowledgement and re-arms the sensor.
//!
//! Everything here runs on the scheduler thread, so none of it is shared.

use super::messages::{
    DEFAULT_DETECTOR_SLOT, Header, MSG_ACKNOWLEDGEMENT, MSG_ZONE_EVENT, Message, header_timestamp,
};
use super::packet::{CodecError, MessageCodec};
use crate::config::Config;
use crate::core::types::ZoneTransition;
use crate::devices::lidar::{DistanceDecoder, FrameLayout, FrameSynchronizer, parse_start_command};
use crate::error::Result;
use crate::transport::Transport;
use crate::zones::{DebounceThresholds, SweepGeometry, ZoneEngine, ZoneState};

/// Header and re-arm settings for outbound traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSettings {
    pub sender: u32,
    pub receiver: u32,
    /// Fixed sequence number; `None` counts up from 1
    pub sequence: Option<u32>,
    /// Bytes written to the sensor on connect and after every acknowledgement
    pub start_command: Vec<u8>,
    /// Detector flag position per zone, indexed like the zones
    pub detector_slots: Vec<usize>,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            sender: 116,
            receiver: 100,
            sequence: None,
            start_command: Vec::new(),
            detector_slots: Vec::new(),
        }
    }
}

/// What happened to one inbound packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// CRC verified; acknowledgement sent and sensor re-armed
    Acknowledged { kind: u32 },
    /// Message parsed but the CRC did not match; no reply
    Rejected {
        computed: u16,
        received: Option<u16>,
    },
    /// Empty, not UTF-8 or not JSON; no reply
    Discarded(String),
}

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_decoded: u64,
    pub transitions_sent: u64,
    /// Zone events lost to encode or write failures
    pub events_dropped: u64,
    pub acks_sent: u64,
    pub crc_failures: u64,
    pub malformed: u64,
    /// Closest sample of the last frame (mm)
    pub last_min_mm: Option<u16>,
    /// Farthest sample of the last frame (mm)
    pub last_max_mm: Option<u16>,
}

/// Sensor-to-consumer protocol state machine
pub struct ProtocolSession<S: Transport, C: Transport> {
    sensor: S,
    consumer: C,
    synchronizer: FrameSynchronizer,
    decoder: DistanceDecoder,
    engine: ZoneEngine,
    codec: MessageCodec,
    settings: ProtocolSettings,
    next_seq: u32,
    read_buffer: Vec<u8>,
    stats: SessionStats,
}

impl<S: Transport, C: Transport> ProtocolSession<S, C> {
    pub fn new(
        sensor: S,
        consumer: C,
        synchronizer: FrameSynchronizer,
        decoder: DistanceDecoder,
        engine: ZoneEngine,
        codec: MessageCodec,
        settings: ProtocolSettings,
    ) -> Self {
        Self {
            sensor,
            consumer,
            read_buffer: vec![0u8; synchronizer.layout().frame_span().max(1)],
            synchronizer,
            decoder,
            engine,
            codec,
            settings,
            next_seq: 1,
            stats: SessionStats::default(),
        }
    }

    /// Build a session from a validated configuration
    pub fn from_config(config: &Config, sensor: S, consumer: C) -> Result<Self> {
        let layout = FrameLayout {
            header_offset: config.radar.header_offset,
            payload_length: config.radar.payload_length,
            ..FrameLayout::default()
        };
        let synchronizer = FrameSynchronizer::with_buffer_limit(layout, config.radar.buffer_limit);
        let decoder = DistanceDecoder::new(config.radar.num_points, config.radar.max_distance_mm);
        let engine = ZoneEngine::new(
            config.zones.clone(),
            SweepGeometry::new(config.radar.num_points, config.radar.sweep_deg),
            DebounceThresholds {
                frame_on: config.debounce.frame_on,
                frame_off: config.debounce.frame_off,
            },
            config.debounce.point_count,
        );
        let codec = MessageCodec::new(config.protocol.crc.function());
        let settings = ProtocolSettings {
            sender: config.protocol.sender,
            receiver: config.protocol.receiver,
            sequence: config.protocol.sequence,
            start_command: parse_start_command(&config.sensor.start_command_hex)?,
            detector_slots: config
                .zones
                .iter()
                .map(|z| z.detector_slot.unwrap_or(config.protocol.detector_slot))
                .collect(),
        };

        let mut session = Self::new(sensor, consumer, synchronizer, decoder, engine, codec, settings);
        session.read_buffer = vec![0u8; config.sensor.read_chunk.max(1)];
        Ok(session)
    }

    /// Send the start command so the sensor begins streaming
    pub fn arm_sensor(&mut self) -> Result<()> {
        if self.settings.start_command.is_empty() {
            log::warn!("No start command configured; sensor must already be streaming");
            return Ok(());
        }
        self.sensor.write_all(&self.settings.start_command)?;
        self.sensor.flush()?;
        log::debug!("Start command sent ({} bytes)", self.settings.start_command.len());
        Ok(())
    }

    /// One non-blocking sensor read, then ingest whatever arrived
    pub fn poll_sensor(&mut self) -> Result<Vec<ZoneTransition>> {
        let n = self.sensor.read(&mut self.read_buffer)?;
        if n == 0 {
            return Ok(Vec::new());
        }
        log::trace!("Sensor read {} bytes", n);
        self.synchronizer.push(&self.read_buffer[..n]);
        self.process_pending()
    }

    /// Feed raw sensor bytes and announce any resulting transitions
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<Vec<ZoneTransition>> {
        self.synchronizer.push(bytes);
        self.process_pending()
    }

    fn process_pending(&mut self) -> Result<Vec<ZoneTransition>> {
        // Extraction always takes the newest marker, so one call drains
        // every complete frame there is
        let Some(payload) = self.synchronizer.try_extract_frame() else {
            return Ok(Vec::new());
        };

        let frame = self.decoder.decode(&payload);
        self.stats.frames_decoded += 1;
        self.stats.last_min_mm = frame.min_distance();
        self.stats.last_max_mm = frame.max_distance();

        let transitions = self.engine.process(&frame);
        for transition in &transitions {
            self.announce(transition)?;
        }
        Ok(transitions)
    }

    /// Encode and send a zone event.
    ///
    /// A failed write drops the event; the error is only returned when it
    /// means the consumer is gone. A packet cut off mid-write counts as gone,
    /// since the consumer can no longer find packet boundaries.
    pub fn announce(&mut self, transition: &ZoneTransition) -> Result<()> {
        let slot = self
            .settings
            .detector_slots
            .get(transition.zone_index)
            .copied()
            .unwrap_or(DEFAULT_DETECTOR_SLOT);
        let message = Message::zone_event(self.header(MSG_ZONE_EVENT), transition.state, slot);

        let packet = match self.codec.encode(&message) {
            Ok(packet) => packet,
            Err(e) => {
                log::error!("Failed to encode zone event: {}", e);
                self.stats.events_dropped += 1;
                return Ok(());
            }
        };

        match self.send_to_consumer(&packet) {
            Ok(()) => {
                self.stats.transitions_sent += 1;
                log::info!(
                    "Sent zone {} {} (seq {})",
                    transition.zone_index + 1,
                    transition.state,
                    message.header().seq
                );
                Ok(())
            }
            Err(e) => {
                self.stats.events_dropped += 1;
                log::error!(
                    "Dropped zone {} {} event: {}",
                    transition.zone_index + 1,
                    transition.state,
                    e
                );
                if e.is_disconnect() { Err(e) } else { Ok(()) }
            }
        }
    }

    /// Validate one consumer packet; acknowledge and re-arm if the CRC holds
    pub fn handle_inbound(&mut self, raw: &[u8]) -> Result<InboundOutcome> {
        log::debug!("Inbound packet ({} bytes): {:?}", raw.len(), String::from_utf8_lossy(raw));

        let decoded = self.codec.decode(raw);
        let message = match decoded.into_verified() {
            Ok(message) => message,
            Err(CodecError::Malformed(reason)) => {
                self.stats.malformed += 1;
                log::warn!("Discarding malformed inbound packet: {}", reason);
                return Ok(InboundOutcome::Discarded(reason));
            }
            Err(CodecError::CrcMismatch { computed, received }) => {
                self.stats.crc_failures += 1;
                log::warn!(
                    "Inbound CRC mismatch: computed {:04X}, received {}",
                    computed,
                    received.map_or_else(|| "none".to_string(), |c| format!("{:04X}", c))
                );
                return Ok(InboundOutcome::Rejected { computed, received });
            }
        };

        let kind = message.kind();
        log::info!(
            "Inbound msg {} (seq {}) from {} verified",
            kind,
            message.header().seq,
            message.header().sender
        );

        let ack = Message::acknowledgement(self.header(MSG_ACKNOWLEDGEMENT));
        let packet = self.codec.encode(&ack)?;
        self.send_to_consumer(&packet)?;
        self.stats.acks_sent += 1;
        log::info!("Acknowledgement sent (seq {})", ack.header().seq);

        self.arm_sensor()?;
        Ok(InboundOutcome::Acknowledged { kind })
    }

    fn send_to_consumer(&mut self, packet: &[u8]) -> Result<()> {
        self.consumer.write_all(packet)?;
        self.consumer.flush()?;
        log::trace!("Wrote {} byte packet to consumer", packet.len());
        Ok(())
    }

    fn header(&mut self, msg: u32) -> Header {
        let seq = match self.settings.sequence {
            Some(fixed) => fixed,
            None => {
                let seq = self.next_seq;
                self.next_seq = self.next_seq.wrapping_add(1);
                seq
            }
        };
        Header {
            sender: self.settings.sender,
            receiver: self.settings.receiver,
            datetime: header_timestamp(),
            msg,
            seq,
        }
    }

    /// Debounce state of every zone
    pub fn zone_states(&self) -> &[ZoneState] {
        self.engine.states()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn engine(&self) -> &ZoneEngine {
        &self.engine
    }
}
