//! Polling, debounce and simulation timing.

use core::time::Duration;

use serde::Deserialize;

use super::units::Millis;

/// Timing configuration for the cooperative loops.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Sensor poll tick; also the cancellation latency bound.
    pub poll_interval_ms: Millis,

    /// Debounce window of the rotation sensor.
    pub debounce_ms: Millis,

    /// Pause after spawning a capture run so it can start before the caller resumes.
    pub start_grace_ms: Millis,

    /// Time per frame when running without hardware.
    pub simulated_frame_ms: Millis,

    /// Give up when no frame edge arrives for this long. Unset polls forever.
    pub stall_timeout_ms: Option<Millis>,
}

impl TimingConfig {
    /// Poll tick as a duration.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_ms.as_duration()
    }

    /// Stall timeout as a duration, if configured.
    #[inline]
    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout_ms.map(Millis::as_duration)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: Millis(10),
            debounce_ms: Millis(500),
            start_grace_ms: Millis(100),
            simulated_frame_ms: Millis(100),
            stall_timeout_ms: None,
        }
    }
}
