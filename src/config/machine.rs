//! Machine configuration - root configuration structure.

use serde::Deserialize;

use super::camera::CameraConfig;
use super::motor::MotorConfig;
use super::pins::PinMap;
use super::timing::TimingConfig;

/// Root configuration structure from TOML.
///
/// Every section is optional; missing values fall back to the stock
/// Cineroll wiring and framing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// BCM pin assignments.
    pub pins: PinMap,

    /// Stepper driver settings.
    pub motor: MotorConfig,

    /// Camera output and framing.
    pub camera: CameraConfig,

    /// Poll, debounce and simulation timing.
    pub timing: TimingConfig,
}
