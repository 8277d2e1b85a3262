use std::collections::VecDeque;

use crate::error::SignalError;
use crate::kernel::time::Millis;

/// Returned when no samples fall inside the requested window.
/// "Assume moderate attention" rather than fail.
pub const NEUTRAL_ATTENTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttentionSample {
    /// 0.0 - 1.0, as produced by the camera collaborator.
    pub score: f64,
    pub at: Millis,
}

/// Time-bounded buffer of attention samples.
#[derive(Debug, Clone)]
pub struct SignalAggregator {
    samples: VecDeque<AttentionSample>,
    horizon_ms: u64,
    latest: Millis,
}

impl SignalAggregator {
    pub fn new(horizon_ms: u64) -> Self {
        Self {
            samples: VecDeque::new(),
            horizon_ms,
            latest: Millis::ZERO,
        }
    }

    pub fn horizon_ms(&self) -> u64 {
        self.horizon_ms
    }

    /// Ingest one score. Invalid scores leave the buffer untouched.
    pub fn record_sample(&mut self, score: f64, now: Millis) -> Result<(), SignalError> {
        if !score.is_finite() {
            return Err(SignalError::NotFinite);
        }
        if !(0.0..=1.0).contains(&score) {
            return Err(SignalError::OutOfRange(score));
        }

        self.latest = self.latest.max(now);
        self.samples.push_back(AttentionSample { score, at: now });
        self.prune(self.latest);
        Ok(())
    }

    /// Drop everything older than the horizon, measured from `now`.
    pub fn prune(&mut self, now: Millis) {
        self.latest = self.latest.max(now);
        let cutoff = self.latest.saturating_sub(self.horizon_ms);
        // Late arrivals can sit behind newer samples, so no early exit.
        self.samples.retain(|s| s.at >= cutoff);
    }

    /// Mean score (0-1) of samples in the last `window_secs`.
    /// Empty window yields `NEUTRAL_ATTENTION`.
    pub fn rolling_average(&self, window_secs: u64, now: Millis) -> f64 {
        let window_ms = window_secs.saturating_mul(1000).min(self.horizon_ms);
        let cutoff = now.saturating_sub(window_ms);

        let (sum, count) = self
            .samples
            .iter()
            .filter(|s| s.at >= cutoff && s.at <= now)
            .fold((0.0, 0usize), |(sum, n), s| (sum + s.score, n + 1));

        if count == 0 {
            return NEUTRAL_ATTENTION;
        }
        sum / count as f64
    }

    pub fn samples(&self) -> impl Iterator<Item = &AttentionSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.latest = Millis::ZERO;
    }
}
