//! Zone geometry and the intra-frame run-length gate.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Angular+radial region of interest, loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Inner radius in mm (inclusive)
    pub min_radius_mm: u32,
    /// Outer radius in mm (inclusive)
    pub max_radius_mm: u32,
    /// Start of the angular window in degrees (inclusive)
    pub min_angle_deg: f64,
    /// End of the angular window in degrees (inclusive)
    pub max_angle_deg: f64,
    /// Opaque tag for logs (`color` in older config files)
    #[serde(default, alias = "color")]
    pub label: String,
    /// Detector flag position reported for this zone, overriding the
    /// protocol default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector_slot: Option<usize>,
}

impl Zone {
    pub fn new(min_radius_mm: u32, max_radius_mm: u32, min_angle_deg: f64, max_angle_deg: f64) -> Self {
        Self {
            min_radius_mm,
            max_radius_mm,
            min_angle_deg,
            max_angle_deg,
            label: String::new(),
            detector_slot: None,
        }
    }

    #[inline]
    pub fn contains_angle(&self, angle_deg: f64) -> bool {
        angle_deg >= self.min_angle_deg && angle_deg <= self.max_angle_deg
    }

    #[inline]
    pub fn contains_distance(&self, distance_mm: u16) -> bool {
        let d = u32::from(distance_mm);
        d >= self.min_radius_mm && d <= self.max_radius_mm
    }

    /// Sample indices whose fixed angle falls inside this zone.
    ///
    /// Angles increase monotonically with the index, so the qualifying
    /// indices always form one contiguous block.
    pub fn angular_window(&self, sweep: &SweepGeometry) -> Option<RangeInclusive<usize>> {
        let mut inside = (0..sweep.sample_count).filter(|&i| self.contains_angle(sweep.angle_of(i)));
        let first = inside.next()?;
        let last = inside.last().unwrap_or(first);
        Some(first..=last)
    }
}

/// Fixed angular position of every sample in a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepGeometry {
    pub sample_count: usize,
    /// Total sweep in degrees; sample 0 is at 0°, the last sample at `sweep_deg`
    pub sweep_deg: f64,
}

impl SweepGeometry {
    pub fn new(sample_count: usize, sweep_deg: f64) -> Self {
        Self {
            sample_count,
            sweep_deg,
        }
    }

    /// Angle of sample `index` in degrees
    #[inline]
    pub fn angle_of(&self, index: usize) -> f64 {
        if self.sample_count < 2 {
            return 0.0;
        }
        self.sweep_deg * index as f64 / (self.sample_count - 1) as f64
    }
}

/// True if `mask` contains at least `run_length` consecutive `true` entries.
///
/// Runs do not wrap from the last sample back to the first.
pub fn has_consecutive_run<I>(mask: I, run_length: usize) -> bool
where
    I: IntoIterator<Item = bool>,
{
    if run_length == 0 {
        return true;
    }
    let mut run = 0;
    for hit in mask {
        if hit {
            run += 1;
            if run >= run_length {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}
