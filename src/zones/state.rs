//! Per-zone debounce state machine

use crate::core::types::Occupancy;

/// Consecutive-frame thresholds for changing state.
///
/// Presence and leave are configured independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceThresholds {
    /// Hit frames needed to go `Leave` → `Presence`
    pub frame_on: u32,
    /// Miss frames needed to go `Presence` → `Leave`
    pub frame_off: u32,
}

impl Default for DebounceThresholds {
    fn default() -> Self {
        Self {
            frame_on: 5,
            frame_off: 5,
        }
    }
}

/// Debounce counters for one zone.
///
/// After the first observation exactly one of the two run counters is
/// non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneState {
    occupancy: Occupancy,
    presence_run: u32,
    miss_run: u32,
}

impl ZoneState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn occupancy(&self) -> Occupancy {
        self.occupancy
    }

    /// Consecutive frames with an occupancy hit
    #[inline]
    pub fn presence_run(&self) -> u32 {
        self.presence_run
    }

    /// Consecutive frames without an occupancy hit
    #[inline]
    pub fn miss_run(&self) -> u32 {
        self.miss_run
    }

    /// Advance by one frame. Returns the new state if it changed.
    pub fn observe(&mut self, hit: bool, thresholds: &DebounceThresholds) -> Option<Occupancy> {
        if hit {
            self.presence_run = self.presence_run.saturating_add(1);
            self.miss_run = 0;
        } else {
            self.miss_run = self.miss_run.saturating_add(1);
            self.presence_run = 0;
        }

        let next = match self.occupancy {
            Occupancy::Leave if self.presence_run >= thresholds.frame_on => Occupancy::Presence,
            Occupancy::Presence if self.miss_run >= thresholds.frame_off => Occupancy::Leave,
            current => current,
        };

        if next == self.occupancy {
            return None;
        }
        self.occupancy = next;
        Some(next)
    }
}
