//! Constants for the sweep lidar stream

// Frame marker: four repeated sync bytes
pub const SYNC_BYTE: u8 = 0x02;
pub const MARKER_LEN: usize = 4;
pub const FRAME_MARKER: [u8; MARKER_LEN] = [SYNC_BYTE; MARKER_LEN];

// Frame layout (offsets counted from the first marker byte)
pub const HEADER_OFFSET: usize = 85;
pub const PAYLOAD_LENGTH: usize = 720; // 360 big-endian u16 samples

// Sweep defaults
pub const DEFAULT_NUM_POINTS: usize = PAYLOAD_LENGTH / 2;
pub const DEFAULT_SWEEP_DEG: f64 = 180.0;
pub const DEFAULT_MAX_DISTANCE_MM: u16 = 10_000;

// Socket reads
pub const READ_CHUNK_SIZE: usize = 4096;

// Buffer size past which stale bytes are compacted away
pub const DEFAULT_BUFFER_LIMIT: usize = 16 * (HEADER_OFFSET + PAYLOAD_LENGTH);
