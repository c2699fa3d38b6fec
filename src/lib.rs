//! Drishti - lidar zone presence detector
//!
//! Reads distance sweeps from a TCP lidar, decides per configured zone
//! whether something is present, and reports debounced transitions to a
//! single downstream consumer as checksummed JSON packets.
//!
//! ## Pipeline
//!
//! ```text
//! sensor bytes -> FrameSynchronizer -> DistanceDecoder -> ZoneEngine
//!              -> ProtocolSession -> MessageCodec -> consumer
//! ```

pub mod app;
pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod streaming;
pub mod transport;
pub mod zones;

// Re-export commonly used types
pub use config::Config;
pub use crate::core::types::{Frame, Occupancy, ZoneTransition};
pub use error::{Error, Result};
