//! Motor driver configuration from TOML.

use serde::Deserialize;

use super::units::{DutyPercent, MicrostepLevels};

/// Stepper driver configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    /// Step signal frequency in Hz, applied by whoever constructs the PWM channel.
    pub pwm_frequency_hz: u32,

    /// Duty cycle of the step signal while the motor runs.
    pub duty_percent: DutyPercent,

    /// Microstepping pin levels, fixed at initialization.
    pub microstep_levels: MicrostepLevels,

    /// Invert direction pin logic (forward drives the pin high).
    pub invert_direction: bool,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            pwm_frequency_hz: 3000,
            duty_percent: DutyPercent::HALF,
            microstep_levels: MicrostepLevels::FINE,
            invert_direction: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: MotorConfig = toml::from_str("pwm_frequency_hz = 8000").unwrap();
        assert_eq!(config.pwm_frequency_hz, 8000);
        assert_eq!(config.duty_percent, DutyPercent::HALF);
        assert_eq!(config.microstep_levels.levels(), [false, true, true]);
    }
}
