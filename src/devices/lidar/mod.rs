//! Sweep lidar over TCP
//!
//! The sensor streams frames continuously once it has received its start
//! command. The same command re-arms it after every acknowledged consumer
//! message.

pub mod constants;
pub mod protocol;

pub use protocol::{DistanceDecoder, FrameLayout, FrameSynchronizer};

use crate::error::{Error, Result};

/// Parse the configured start command (hex, whitespace allowed)
pub fn parse_start_command(hex_str: &str) -> Result<Vec<u8>> {
    let compact: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact)
        .map_err(|e| Error::InvalidParameter(format!("start command '{}': {}", hex_str, e)))
}
