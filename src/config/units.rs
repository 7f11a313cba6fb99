//! Unit types for configuration values.
//!
//! Wraps raw TOML numbers so durations, duty cycles and resolutions cannot be
//! confused with one another.

use core::time::Duration;

use serde::Deserialize;

/// Duration in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(transparent)]
pub struct Millis(pub u64);

impl Millis {
    /// Create a new Millis value.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Convert to a [`Duration`].
    #[inline]
    pub const fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }
}

/// PWM duty cycle in percent (1-100 once validated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct DutyPercent(pub u8);

impl DutyPercent {
    /// Half duty, the square wave used for step pulses.
    pub const HALF: Self = Self(50);

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Check if the duty cycle can drive the step signal.
    #[inline]
    pub fn is_valid(self) -> bool {
        (1..=100).contains(&self.0)
    }
}

impl Default for DutyPercent {
    fn default() -> Self {
        Self::HALF
    }
}

/// Camera output resolution, written as `[width, height]` in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "(u32, u32)")]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// PAL still size used for Super-8 scans.
    pub const PAL: Self = Self {
        width: 720,
        height: 576,
    };

    /// Create a new resolution.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::PAL
    }
}

/// Logic levels for the MS1..MS3 microstepping inputs of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct MicrostepLevels(pub [bool; 3]);

impl MicrostepLevels {
    /// MS1 low, MS2 and MS3 high.
    pub const FINE: Self = Self([false, true, true]);

    /// Get the level for each pin, MS1 first.
    #[inline]
    pub const fn levels(self) -> [bool; 3] {
        self.0
    }
}

impl Default for MicrostepLevels {
    fn default() -> Self {
        Self::FINE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_duration() {
        assert_eq!(Millis(10).as_duration(), Duration::from_millis(10));
    }

    #[test]
    fn test_duty_range() {
        assert!(DutyPercent(1).is_valid());
        assert!(DutyPercent(100).is_valid());
        assert!(!DutyPercent(0).is_valid());
        assert!(!DutyPercent(101).is_valid());
    }

    #[test]
    fn test_resolution_from_tuple() {
        assert_eq!(Resolution::from((1024, 768)), Resolution::new(1024, 768));
    }
}
