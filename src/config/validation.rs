//! Configuration validation.

use crate::error::{bounded, ConfigError, Result};
use crate::framing::{PAN_MAX, PAN_MIN, ZOOM_MAX, ZOOM_MIN};

use super::{CameraConfig, MachineConfig, MotorConfig, PinMap, TimingConfig};

/// Validate a machine configuration.
///
/// Checks:
/// - Duty cycle is 1-100 and PWM frequency is non-zero
/// - Default framing lies inside the clamp ranges, nudge steps are positive
/// - Resolution and poll interval are non-zero
/// - Image extension is a plain alphanumeric token
/// - No BCM pin is assigned twice
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    validate_motor(&config.motor)?;
    validate_camera(&config.camera)?;
    validate_timing(&config.timing)?;
    validate_pins(&config.pins)?;
    Ok(())
}

fn validate_motor(config: &MotorConfig) -> Result<()> {
    if !config.duty_percent.is_valid() {
        return Err(ConfigError::InvalidDutyCycle(config.duty_percent.value()).into());
    }

    if config.pwm_frequency_hz == 0 {
        return Err(ConfigError::InvalidPwmFrequency(config.pwm_frequency_hz).into());
    }

    Ok(())
}

fn check_range(axis: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::FramingOutOfRange {
            axis,
            value,
            min,
            max,
        }
        .into());
    }
    Ok(())
}

fn validate_camera(config: &CameraConfig) -> Result<()> {
    let res = config.resolution;
    if res.width == 0 || res.height == 0 {
        return Err(ConfigError::InvalidResolution {
            width: res.width,
            height: res.height,
        }
        .into());
    }

    check_range("zoom", config.zoom, ZOOM_MIN, ZOOM_MAX)?;
    check_range("pan_h", config.pan_h, PAN_MIN, PAN_MAX)?;
    check_range("pan_v", config.pan_v, PAN_MIN, PAN_MAX)?;

    for (axis, value) in [("zoom", config.zoom_step), ("pan", config.pan_step)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::InvalidStep { axis, value }.into());
        }
    }

    let ext = config.image_extension.as_str();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::InvalidImageExtension(bounded(ext)).into());
    }

    Ok(())
}

fn validate_timing(config: &TimingConfig) -> Result<()> {
    if config.poll_interval_ms.value() == 0 {
        return Err(ConfigError::InvalidPollInterval.into());
    }
    Ok(())
}

fn validate_pins(pins: &PinMap) -> Result<()> {
    let assignments = pins.assignments();

    for (i, &(name, pin)) in assignments.iter().enumerate() {
        if let Some(&(first, _)) = assignments[..i].iter().find(|(_, p)| *p == pin) {
            return Err(ConfigError::DuplicatePin {
                pin,
                first,
                second: name,
            }
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::units::{DutyPercent, Millis};
    use crate::error::Error;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MachineConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_duty_cycle() {
        let mut config = MachineConfig::default();
        config.motor.duty_percent = DutyPercent(0);

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidDutyCycle(0)))
        ));
    }

    #[test]
    fn test_zoom_out_of_range() {
        let mut config = MachineConfig::default();
        config.camera.zoom = 0.05;

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::FramingOutOfRange { axis: "zoom", .. }))
        ));
    }

    #[test]
    fn test_zero_poll_interval() {
        let mut config = MachineConfig::default();
        config.timing.poll_interval_ms = Millis(0);

        assert!(matches!(
            validate_config(&config),
            Err(Error::Config(ConfigError::InvalidPollInterval))
        ));
    }

    #[test]
    fn test_extension_with_dot_rejected() {
        let mut config = MachineConfig::default();
        config.camera.image_extension = ".jpg".into();

        assert!(matches!(
            validate_config(&config),
            Err(Error::Config(ConfigError::InvalidImageExtension(_)))
        ));
    }

    #[test]
    fn test_duplicate_pin() {
        let mut config = MachineConfig::default();
        config.pins.led = config.pins.enable;

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::DuplicatePin {
                pin: 25,
                first: "enable",
                second: "led",
            }))
        ));
    }

    #[test]
    fn test_duplicate_pin_in_last_assignment() {
        let mut config = MachineConfig::default();
        config.pins.microstep = [9, 10, 9];

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::DuplicatePin {
                pin: 9,
                first: "ms1",
                second: "ms3",
            }))
        ));
    }

    #[test]
    fn test_all_distinct_pins_accepted() {
        let mut config = MachineConfig::default();
        config.pins.microstep = [2, 3, 4];
        config.pins.led = 5;

        assert!(validate_config(&config).is_ok());
    }
}
