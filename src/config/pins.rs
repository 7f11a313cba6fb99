//! BCM pin assignments.

use serde::Deserialize;

/// Wiring of the digitizer, in BCM numbering.
///
/// The core never opens pins itself; this table is handed to the layer that
/// constructs the embedded-hal pin objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PinMap {
    /// PWM step signal.
    pub step: u8,
    /// Direction (low = forward unless inverted).
    pub direction: u8,
    /// Driver enable, active low.
    pub enable: u8,
    /// Rotation sensor, one falling edge per frame.
    pub frame_sensor: u8,
    /// Illumination LED.
    pub led: u8,
    /// MS1..MS3 microstepping inputs.
    pub microstep: [u8; 3],
}

impl PinMap {
    /// Every assignment paired with its function name.
    pub fn assignments(&self) -> [(&'static str, u8); 8] {
        [
            ("step", self.step),
            ("direction", self.direction),
            ("enable", self.enable),
            ("frame_sensor", self.frame_sensor),
            ("led", self.led),
            ("ms1", self.microstep[0]),
            ("ms2", self.microstep[1]),
            ("ms3", self.microstep[2]),
        ]
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            step: 18,
            direction: 7,
            enable: 25,
            frame_sensor: 17,
            led: 14,
            microstep: [9, 10, 11],
        }
    }
}
