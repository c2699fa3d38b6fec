//! Device implementations

pub mod lidar;
