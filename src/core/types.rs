//! Core data types for frames and zone transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One decoded sweep: `N` distance samples (mm) in fixed angular order.
///
/// Produced by the distance decoder, consumed by the zone engine and then
/// dropped. Sample `i` sits at angle `i * sweep / (N - 1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    samples: Vec<u16>,
}

impl Frame {
    /// Wrap already-calibrated samples
    pub fn new(samples: Vec<u16>) -> Self {
        Self { samples }
    }

    /// Distance samples in angular order
    #[inline]
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Number of samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the frame has no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Smallest sample, `None` for an empty frame
    pub fn min_distance(&self) -> Option<u16> {
        self.samples.iter().copied().min()
    }

    /// Largest sample, `None` for an empty frame
    pub fn max_distance(&self) -> Option<u16> {
        self.samples.iter().copied().max()
    }
}

/// Debounced occupancy of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occupancy {
    /// Nothing in the zone (initial state)
    #[default]
    Leave,
    /// Something has been in the zone for `frame_on` consecutive frames
    Presence,
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occupancy::Leave => write!(f, "leave"),
            Occupancy::Presence => write!(f, "presence"),
        }
    }
}

/// A zone changed its debounced state on the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneTransition {
    /// Index into the configured zone list
    pub zone_index: usize,
    /// State the zone moved into
    pub state: Occupancy,
}
