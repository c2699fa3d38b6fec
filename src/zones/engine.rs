//! Zone occupancy engine
//!
//! Runs once per decoded frame:
//!
//! 1. Mask the samples that fall inside each zone (angle AND distance)
//! 2. Count the frame as a hit if the mask holds a run of `run_length`
//!    consecutive samples, which rejects single-sample reflections
//! 3. Feed the hit into the zone's debounce counters, which reject
//!    frame-to-frame jitter at zone boundaries
//! 4. Report zones whose debounced state actually changed

use super::geometry::{SweepGeometry, Zone, has_consecutive_run};
use super::state::{DebounceThresholds, ZoneState};
use crate::core::types::{Frame, Occupancy, ZoneTransition};
use std::ops::RangeInclusive;

/// Default minimum run of consecutive in-zone samples
pub const DEFAULT_RUN_LENGTH: usize = 5;

/// Zone with its angular window resolved to sample indices
#[derive(Debug, Clone)]
struct CompiledZone {
    zone: Zone,
    window: Option<RangeInclusive<usize>>,
}

/// Per-frame classification summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSummary {
    /// Zones whose mask passed the run-length gate this frame
    pub hits: usize,
    /// Zones currently debounced to `Presence`
    pub occupied: usize,
}

/// Classifies frames into zones and debounces per-zone occupancy
pub struct ZoneEngine {
    zones: Vec<CompiledZone>,
    states: Vec<ZoneState>,
    thresholds: DebounceThresholds,
    run_length: usize,
    last_summary: FrameSummary,
}

impl ZoneEngine {
    pub fn new(
        zones: Vec<Zone>,
        sweep: SweepGeometry,
        thresholds: DebounceThresholds,
        run_length: usize,
    ) -> Self {
        let zones: Vec<CompiledZone> = zones
            .into_iter()
            .map(|zone| {
                let window = zone.angular_window(&sweep);
                if window.is_none() {
                    log::warn!(
                        "Zone '{}' ({:.1}°..{:.1}°) covers no sample angle and will never trigger",
                        zone.label,
                        zone.min_angle_deg,
                        zone.max_angle_deg
                    );
                }
                CompiledZone { zone, window }
            })
            .collect();
        let states = vec![ZoneState::new(); zones.len()];

        Self {
            zones,
            states,
            thresholds,
            run_length,
            last_summary: FrameSummary::default(),
        }
    }

    /// Number of configured zones
    #[inline]
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Debounce state of every zone, indexed like the configuration
    pub fn states(&self) -> &[ZoneState] {
        &self.states
    }

    /// Summary of the most recent frame
    pub fn last_summary(&self) -> FrameSummary {
        self.last_summary
    }

    /// Sample mask for one zone: `true` where both angle and distance qualify.
    ///
    /// Returns an all-false mask for an unknown zone index.
    pub fn mask(&self, zone_index: usize, frame: &Frame) -> Vec<bool> {
        let mut mask = vec![false; frame.len()];
        let Some(compiled) = self.zones.get(zone_index) else {
            return mask;
        };
        if let Some(window) = &compiled.window {
            for index in window.clone() {
                if let Some(&distance) = frame.samples().get(index) {
                    mask[index] = compiled.zone.contains_distance(distance);
                }
            }
        }
        mask
    }

    /// Whether the zone's mask passes the run-length gate for this frame
    pub fn is_hit(&self, zone_index: usize, frame: &Frame) -> bool {
        has_consecutive_run(self.mask(zone_index, frame), self.run_length)
    }

    /// Advance every zone by one frame, returning the zones that changed state
    pub fn process(&mut self, frame: &Frame) -> Vec<ZoneTransition> {
        let mut transitions = Vec::new();
        let mut hits = 0;

        for zone_index in 0..self.zones.len() {
            let hit = self.is_hit(zone_index, frame);
            if hit {
                hits += 1;
            }

            if let Some(state) = self.states[zone_index].observe(hit, &self.thresholds) {
                log::info!(
                    "Zone {} ({}) -> {}",
                    zone_index + 1,
                    self.zones[zone_index].zone.label,
                    state
                );
                transitions.push(ZoneTransition { zone_index, state });
            }
        }

        self.last_summary = FrameSummary {
            hits,
            occupied: self
                .states
                .iter()
                .filter(|s| s.occupancy() == Occupancy::Presence)
                .count(),
        };
        transitions
    }
}
