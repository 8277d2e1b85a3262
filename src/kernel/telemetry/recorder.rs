use std::collections::VecDeque;

use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, TelemetrySnapshot};
use crate::config::DEFAULT_TELEMETRY_EVENTS;

/// Ring of the engine's most recent diagnostic events.
#[derive(Debug)]
pub struct TelemetryRecorder {
    buffer: VecDeque<TelemetryEvent>,
    capacity: usize,
    evicted: u64,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TELEMETRY_EVENTS)
    }

    /// Keeps at most `capacity` events (minimum one); older ones are evicted.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity.min(DEFAULT_TELEMETRY_EVENTS)),
            capacity,
            evicted: 0,
        }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
            self.evicted += 1;
        }
        self.buffer.push_back(event);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events dropped to stay within capacity since the last `clear`.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        compute_snapshot(&self.buffer)
    }

    pub fn events(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.evicted = 0;
    }
}
