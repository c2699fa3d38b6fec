//! Configuration for Drishti
//!
//! Loaded from TOML, or JSON when the file name ends in `.json`. Every
//! section except `[sensor]` and `[server]` may be omitted.
//!
//! ```toml
//! [sensor]
//! address = "192.168.1.200:2111"
//! start_command_hex = "A5 20"
//!
//! [server]
//! bind_address = "0.0.0.0:5000"
//!
//! [[zones]]
//! min_radius_mm = 0
//! max_radius_mm = 2000
//! min_angle_deg = 80.0
//! max_angle_deg = 100.0
//! label = "red"
//! ```

use crate::devices::lidar::constants::{
    DEFAULT_BUFFER_LIMIT, DEFAULT_MAX_DISTANCE_MM, DEFAULT_NUM_POINTS, DEFAULT_SWEEP_DEG,
    HEADER_OFFSET, MARKER_LEN, PAYLOAD_LENGTH, READ_CHUNK_SIZE,
};
use crate::devices::lidar::parse_start_command;
use crate::error::{Error, Result};
use crate::streaming::crc::Crc16Variant;
use crate::streaming::messages::{DEFAULT_DETECTOR_SLOT, FLAG_WIDTH};
use crate::zones::{DEFAULT_RUN_LENGTH, Zone};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tried when the requested configuration file cannot be read
pub const FALLBACK_CONFIG: &str = "lidar_config.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub sensor: SensorConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub radar: RadarConfig,
    #[serde(default)]
    pub debounce: DebounceConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Lidar connection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SensorConfig {
    /// Sensor TCP address (`host:port`)
    pub address: String,
    /// Start command as hex; whitespace is ignored
    #[serde(default)]
    pub start_command_hex: String,
    /// Bytes requested per sensor read
    #[serde(default = "default_read_chunk")]
    pub read_chunk: usize,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Consumer-facing server
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address for the single consumer (`host:port`)
    pub bind_address: String,
    /// Upper bound on one blocking packet write
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

/// Sweep geometry and stream layout
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RadarConfig {
    /// Samples per frame (N)
    pub num_points: usize,
    /// Samples are clamped to this distance
    pub max_distance_mm: u16,
    /// Sensor poll period
    pub update_ms: u64,
    /// Angle covered by the N samples
    pub sweep_deg: f64,
    /// Marker start to payload start
    pub header_offset: usize,
    pub payload_length: usize,
    /// Buffered bytes tolerated before stale data is compacted away
    pub buffer_limit: usize,
}

/// Zone debounce
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Consecutive hit frames before `Presence`
    pub frame_on: u32,
    /// Consecutive miss frames before `Leave`
    pub frame_off: u32,
    /// Consecutive in-zone samples for a frame to count as a hit
    pub point_count: usize,
}

/// Consumer message settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub sender: u32,
    pub receiver: u32,
    /// Fixed header sequence number; omit to count up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    pub crc: Crc16Variant,
    /// Detector flag position for zones without their own
    pub detector_slot: usize,
    /// Inbound queue drain period
    pub queue_drain_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter (trace, debug, info, warn, error); `RUST_LOG` wins
    pub level: String,
    /// Period of the statistics line; 0 disables it
    pub stats_interval_s: u64,
}

fn default_read_chunk() -> usize {
    READ_CHUNK_SIZE
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_write_timeout_ms() -> u64 {
    1000
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:2111".to_string(),
            start_command_hex: String::new(),
            read_chunk: default_read_chunk(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            num_points: DEFAULT_NUM_POINTS,
            max_distance_mm: DEFAULT_MAX_DISTANCE_MM,
            update_ms: 30,
            sweep_deg: DEFAULT_SWEEP_DEG,
            header_offset: HEADER_OFFSET,
            payload_length: PAYLOAD_LENGTH,
            buffer_limit: DEFAULT_BUFFER_LIMIT,
        }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            frame_on: 5,
            frame_off: 5,
            point_count: DEFAULT_RUN_LENGTH,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            sender: 116,
            receiver: 100,
            sequence: None,
            crc: Crc16Variant::default(),
            detector_slot: DEFAULT_DETECTOR_SLOT,
            queue_drain_ms: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            stats_interval_s: 10,
        }
    }
}

impl Config {
    /// Load and validate configuration.
    ///
    /// Falls back to [`FALLBACK_CONFIG`] in the working directory when `path`
    /// cannot be read. Returns the file that was actually used.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<(Self, PathBuf)> {
        Self::load_from(path.as_ref(), Path::new(FALLBACK_CONFIG))
    }

    fn load_from(path: &Path, fallback: &Path) -> Result<(Self, PathBuf)> {
        let (contents, used) = match fs::read_to_string(path) {
            Ok(contents) => (contents, path),
            Err(e) => {
                let contents = fs::read_to_string(fallback).map_err(|e2| {
                    Error::Config(format!(
                        "cannot read {} ({}) or {} ({})",
                        path.display(),
                        e,
                        fallback.display(),
                        e2
                    ))
                })?;
                (contents, fallback)
            }
        };

        let config = Self::parse(&contents, is_json(used))?;
        config.validate()?;
        Ok((config, used.to_path_buf()))
    }

    /// Parse configuration text without validating it
    pub fn parse(contents: &str, json: bool) -> Result<Self> {
        if json {
            serde_json::from_str(contents).map_err(|e| Error::Config(e.to_string()))
        } else {
            Ok(toml::from_str(contents)?)
        }
    }

    /// Reject values the detector cannot run with
    pub fn validate(&self) -> Result<()> {
        let radar = &self.radar;
        if radar.num_points < 2 {
            return Err(invalid("radar.num_points must be at least 2"));
        }
        if radar.payload_length == 0 {
            return Err(invalid("radar.payload_length must be positive"));
        }
        if radar.header_offset < MARKER_LEN {
            return Err(invalid(format!(
                "radar.header_offset must be at least {} (marker length)",
                MARKER_LEN
            )));
        }
        if radar.max_distance_mm == 0 {
            return Err(invalid("radar.max_distance_mm must be positive"));
        }
        if !radar.sweep_deg.is_finite() || radar.sweep_deg <= 0.0 {
            return Err(invalid("radar.sweep_deg must be a positive angle"));
        }
        if radar.update_ms == 0 || self.protocol.queue_drain_ms == 0 {
            return Err(invalid("radar.update_ms and protocol.queue_drain_ms must be positive"));
        }
        if self.sensor.read_chunk == 0 {
            return Err(invalid("sensor.read_chunk must be positive"));
        }

        let debounce = &self.debounce;
        if debounce.frame_on == 0 || debounce.frame_off == 0 || debounce.point_count == 0 {
            return Err(invalid(
                "debounce.frame_on, frame_off and point_count must be positive",
            ));
        }

        parse_start_command(&self.sensor.start_command_hex)
            .map_err(|e| Error::Config(e.to_string()))?;

        if self.protocol.detector_slot >= FLAG_WIDTH {
            return Err(invalid(format!(
                "protocol.detector_slot must be below {}",
                FLAG_WIDTH
            )));
        }

        for (i, zone) in self.zones.iter().enumerate() {
            if zone.min_radius_mm > zone.max_radius_mm {
                return Err(invalid(format!("zone {}: min_radius_mm > max_radius_mm", i + 1)));
            }
            if !zone.min_angle_deg.is_finite()
                || !zone.max_angle_deg.is_finite()
                || zone.min_angle_deg > zone.max_angle_deg
            {
                return Err(invalid(format!("zone {}: invalid angle range", i + 1)));
            }
            if zone.detector_slot.is_some_and(|slot| slot >= FLAG_WIDTH) {
                return Err(invalid(format!(
                    "zone {}: detector_slot must be below {}",
                    i + 1,
                    FLAG_WIDTH
                )));
            }
        }

        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            return Err(invalid(format!("unknown log level '{}'", self.logging.level)));
        }
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::Config(msg.into())
}
