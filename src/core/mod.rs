//! Core data types shared by the sensor, zone and streaming layers.
//!
//! - [`types::Frame`]: One decoded sweep of distance samples
//! - [`types::Occupancy`]: Debounced zone state
//! - [`types::ZoneTransition`]: Event emitted when a zone changes state

pub mod types;
