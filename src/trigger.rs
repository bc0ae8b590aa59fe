use bytes::BytesMut;

use crate::error::ConfigError;

/// The `[min, max]` byte-count window controlling when accumulated bytes
/// are delivered as one read event.
///
/// `min` is the latency knob: a flush happens as soon as that many bytes
/// have accumulated. `max` bounds the payload of a single event so a
/// burst cannot starve delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRange {
    min: usize,
    max: usize,
}

impl ReadRange {
    /// Create a range. `min` must be at least one, and `max` at least `min`.
    pub fn new(min: usize, max: usize) -> Result<Self, ConfigError> {
        if min < 1 || max < min {
            return Err(ConfigError::InvalidRange { min, max });
        }

        Ok(Self { min, max })
    }

    /// Flush as soon as this many bytes have accumulated.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Deliver at most this many bytes per read event.
    pub fn max(&self) -> usize {
        self.max
    }
}

/// Accumulates bytes as they arrive off the wire and decides when to
/// flush them as read events.
///
/// Starts disarmed: bytes accumulate, but nothing flushes until a range
/// is armed. Re-arming applies from the next decision and never discards
/// what has already accumulated.
#[derive(Debug, Default)]
pub(crate) struct TriggerBuffer {
    accumulated: BytesMut,
    range: Option<ReadRange>,
}

impl TriggerBuffer {
    /// Bytes arrived from the wire. The sole path by which the buffer grows.
    pub(crate) fn arrived(&mut self, bytes: &[u8]) {
        self.accumulated.extend_from_slice(bytes);
    }

    /// Arm (or re-arm) the trigger range.
    pub(crate) fn arm(&mut self, range: ReadRange) {
        self.range = Some(range);
    }

    /// One accumulation decision.
    ///
    /// If at least `min` bytes have accumulated, splits off the first
    /// `min(len, max)` of them as one flush, retaining the excess.
    /// Call again until `None` to drain after a burst.
    pub(crate) fn decide(&mut self) -> Option<Vec<u8>> {
        let range = self.range?;

        if self.accumulated.len() < range.min() {
            return None;
        }

        let take = self.accumulated.len().min(range.max());
        Some(self.accumulated.split_to(take).to_vec())
    }
}
