//! Zone classification and debounce.
//!
//! - [`geometry`]: Zone shapes, sample angles and the run-length gate
//! - [`state`]: Per-zone debounce counters
//! - [`engine`]: Frame-by-frame driver producing transitions

pub mod engine;
pub mod geometry;
pub mod state;

pub use engine::{DEFAULT_RUN_LENGTH, FrameSummary, ZoneEngine};
pub use geometry::{SweepGeometry, Zone, has_consecutive_run};
pub use state::{DebounceThresholds, ZoneState};
