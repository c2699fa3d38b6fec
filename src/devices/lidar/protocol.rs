//! Sweep lidar stream protocol
//!
//! Frame format (offsets from the marker start):
//!
//! ```text
//! ┌──────────────────┬──────────────────────┬──────────────────────────┐
//! │ Marker (4 bytes) │ Header (rest of 85)  │ Payload (720 bytes)      │
//! │ 02 02 02 02      │ skipped              │ 360 × u16 big-endian mm  │
//! └──────────────────┴──────────────────────┴──────────────────────────┘
//! ```
//!
//! The stream carries no length field or checksum, so synchronization always
//! jumps to the newest marker. Older frames still sitting in the buffer are
//! dropped: only the freshest sweep matters for live detection.

use super::constants::{
    DEFAULT_BUFFER_LIMIT, FRAME_MARKER, HEADER_OFFSET, MARKER_LEN, PAYLOAD_LENGTH,
};
use crate::core::types::Frame;

/// Where the payload sits relative to the frame marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub marker: [u8; MARKER_LEN],
    /// Bytes from the marker start to the first payload byte
    pub header_offset: usize,
    /// Payload size in bytes
    pub payload_length: usize,
}

impl FrameLayout {
    /// Bytes needed after the marker start for a complete frame
    #[inline]
    pub fn frame_span(&self) -> usize {
        self.header_offset + self.payload_length
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            marker: FRAME_MARKER,
            header_offset: HEADER_OFFSET,
            payload_length: PAYLOAD_LENGTH,
        }
    }
}

/// Reassembles payload frames from an unreliable byte stream
pub struct FrameSynchronizer {
    buffer: Vec<u8>,
    layout: FrameLayout,
    buffer_limit: usize,
}

impl FrameSynchronizer {
    pub fn new(layout: FrameLayout) -> Self {
        Self::with_buffer_limit(layout, DEFAULT_BUFFER_LIMIT)
    }

    /// Create a synchronizer that compacts its buffer once it holds more
    /// than `buffer_limit` bytes without producing a frame.
    pub fn with_buffer_limit(layout: FrameLayout, buffer_limit: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(2 * layout.frame_span()),
            layout,
            buffer_limit: buffer_limit.max(layout.frame_span()),
        }
    }

    /// Append bytes received from the sensor
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes currently buffered
    #[inline]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Layout this synchronizer extracts
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Extract the payload following the newest marker, if complete.
    ///
    /// Returns `None` while the newest marker is missing or still waiting for
    /// bytes. On success everything up to the end of the payload is consumed,
    /// including any earlier markers.
    pub fn try_extract_frame(&mut self) -> Option<Vec<u8>> {
        let Some(start) = self.last_marker() else {
            self.compact(None);
            return None;
        };

        let end = start + self.layout.frame_span();
        if self.buffer.len() < end {
            self.compact(Some(start));
            return None;
        }

        let payload = self.buffer[start + self.layout.header_offset..end].to_vec();
        self.buffer.drain(..end);

        log::trace!(
            "Frame extracted at offset {}, {} bytes left buffered",
            start,
            self.buffer.len()
        );
        Some(payload)
    }

    /// Start of the last complete marker in the buffer
    fn last_marker(&self) -> Option<usize> {
        let marker = &self.layout.marker;
        self.buffer
            .windows(marker.len())
            .rposition(|window| window == marker)
    }

    /// Drop bytes that can no longer affect extraction.
    ///
    /// Only the newest marker is ever used, so anything before it is dead.
    /// Without a marker, only a partial marker at the tail can matter.
    fn compact(&mut self, newest_marker: Option<usize>) {
        if self.buffer.len() <= self.buffer_limit {
            return;
        }
        let keep_from = match newest_marker {
            Some(start) => start,
            None => self.buffer.len().saturating_sub(self.layout.marker.len() - 1),
        };
        if keep_from > 0 {
            log::debug!("Compacting sensor buffer: dropping {} stale bytes", keep_from);
            self.buffer.drain(..keep_from);
        }
    }
}

/// Converts raw payloads into calibrated distance frames
#[derive(Debug, Clone, Copy)]
pub struct DistanceDecoder {
    sample_count: usize,
    max_distance: u16,
}

impl DistanceDecoder {
    pub fn new(sample_count: usize, max_distance: u16) -> Self {
        Self {
            sample_count,
            max_distance,
        }
    }

    /// Configured samples per frame (`N`)
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Decode big-endian u16 samples.
    ///
    /// Always returns exactly `N` samples in `[0, max_distance]`: short
    /// payloads are zero-padded, long ones truncated, and a trailing odd byte
    /// is ignored.
    pub fn decode(&self, payload: &[u8]) -> Frame {
        let mut samples: Vec<u16> = payload
            .chunks_exact(2)
            .take(self.sample_count)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]).min(self.max_distance))
            .collect();
        samples.resize(self.sample_count, 0);
        Frame::new(samples)
    }
}
