//! Tests for TOML configuration loading and validation.

use std::io::Write;

use cineroll::config::{load_config, parse_config, validate_config, MachineConfig, Millis};
use cineroll::{ConfigError, Error, Framing};

const BENCH_CONFIG: &str = r#"
[pins]
step = 12
direction = 5
enable = 6
frame_sensor = 27
led = 22
microstep = [23, 24, 16]

[motor]
pwm_frequency_hz = 4000
duty_percent = 40
microstep_levels = [true, true, true]
invert_direction = true

[camera]
resolution = [1440, 1080]
zoom = 0.5
pan_h = 0.5
pan_v = 0.5
zoom_step = 0.02
pan_step = 0.05
image_extension = "png"

[timing]
poll_interval_ms = 5
debounce_ms = 300
start_grace_ms = 50
simulated_frame_ms = 40
stall_timeout_ms = 2000
"#;

/// Test parsing a complete bench configuration.
#[test]
fn test_parse_full_config() {
    let config = parse_config(BENCH_CONFIG).expect("bench config parses");

    assert_eq!(config.pins.frame_sensor, 27);
    assert_eq!(config.pins.microstep, [23, 24, 16]);
    assert_eq!(config.motor.duty_percent.value(), 40);
    assert_eq!(config.motor.microstep_levels.levels(), [true, true, true]);
    assert!(config.motor.invert_direction);
    assert_eq!(config.camera.resolution.width, 1440);
    assert_eq!(config.camera.image_extension, "png");
    assert_eq!(config.timing.poll_interval_ms, Millis(5));
    assert_eq!(
        config.timing.stall_timeout(),
        Some(std::time::Duration::from_secs(2))
    );
}

/// Test that the framing picks up configured defaults and steps.
#[test]
fn test_framing_from_config() {
    let config = parse_config(BENCH_CONFIG).unwrap();
    let mut framing = Framing::from_config(&config.camera);

    assert!((framing.nudge_zoom(1) - 0.48).abs() < 1e-9);
    let (h, v) = framing.nudge_pan(1, -2);
    assert!((h - 0.55).abs() < 1e-9);
    assert!((v - 0.40).abs() < 1e-9);
}

/// Test that sections left out fall back to the stock machine.
#[test]
fn test_partial_config_uses_defaults() {
    let config = parse_config("[camera]\nzoom = 0.8\n").unwrap();
    let stock = MachineConfig::default();

    assert_eq!(config.pins, stock.pins);
    assert_eq!(config.motor, stock.motor);
    assert_eq!(config.timing, stock.timing);
    assert!((config.camera.zoom - 0.8).abs() < f64::EPSILON);
    assert!(config.timing.stall_timeout().is_none());
}

/// Test loading from a file on disk.
#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(BENCH_CONFIG.as_bytes()).unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.motor.pwm_frequency_hz, 4000);
}

/// Test that invalid values are rejected at parse time.
#[test]
fn test_parse_rejects_invalid_values() {
    let cases = [
        "[motor]\nduty_percent = 0",
        "[motor]\nduty_percent = 101",
        "[motor]\npwm_frequency_hz = 0",
        "[camera]\nzoom = 0.05",
        "[camera]\npan_v = 1.5",
        "[camera]\nzoom_step = 0.0",
        "[camera]\nresolution = [0, 576]",
        "[camera]\nimage_extension = \"../jpg\"",
        "[timing]\npoll_interval_ms = 0",
        "[pins]\nled = 18",
    ];

    for toml in cases {
        let result = parse_config(toml);
        assert!(
            matches!(result, Err(Error::Config(_))),
            "expected config error for {toml:?}, got {result:?}"
        );
    }
}

/// Test that a doubled pin names both functions.
#[test]
fn test_duplicate_pin_reported() {
    let mut config = MachineConfig::default();
    config.pins.led = config.pins.frame_sensor;

    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::DuplicatePin {
            pin: 17,
            first: "frame_sensor",
            second: "led",
        }))
    );
}
