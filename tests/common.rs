//! Test utilities for Drishti integration tests.
//!
//! Builds sensor frames in the wire layout and small configurations.

#![allow(dead_code)]

use drishti::Config;
use drishti::devices::lidar::constants::{FRAME_MARKER, HEADER_OFFSET, PAYLOAD_LENGTH};

/// Configuration for the reference scenario: N = 181 over 180°, one zone at
/// 80..100° and 0..2000 mm, debounce 5/5, run length 5.
pub fn scenario_config() -> Config {
    let text = r#"
[sensor]
address = "127.0.0.1:2111"
start_command_hex = "A5 20"

[server]
bind_address = "127.0.0.1:0"

[radar]
num_points = 181
sweep_deg = 180.0

[debounce]
frame_on = 5
frame_off = 5
point_count = 5

[[zones]]
min_radius_mm = 0
max_radius_mm = 2000
min_angle_deg = 80.0
max_angle_deg = 100.0
label = "door"
"#;
    let config = Config::parse(text, false).unwrap();
    config.validate().unwrap();
    config
}

/// One complete sensor frame: marker, zeroed header, 360 big-endian samples.
///
/// `distance_at(i)` gives sample `i`.
pub fn sensor_frame(distance_at: impl Fn(usize) -> u16) -> Vec<u8> {
    let mut bytes = FRAME_MARKER.to_vec();
    bytes.resize(HEADER_OFFSET, 0x00);
    for i in 0..PAYLOAD_LENGTH / 2 {
        bytes.extend_from_slice(&distance_at(i).to_be_bytes());
    }
    bytes
}

/// Samples 85..=95 at 1000 mm, everything else at 5000 mm
pub fn occupied_frame() -> Vec<u8> {
    sensor_frame(|i| if (85..=95).contains(&i) { 1000 } else { 5000 })
}

/// Every sample at 5000 mm
pub fn empty_frame() -> Vec<u8> {
    sensor_frame(|_| 5000)
}
