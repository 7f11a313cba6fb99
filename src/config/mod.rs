//! Configuration module for cineroll.
//!
//! Provides types for loading and validating the machine configuration
//! (wiring, motor, camera framing and timing) from TOML files or strings.

mod camera;
mod loader;
mod machine;
mod motor;
mod pins;
mod timing;
pub mod units;
mod validation;

pub use camera::CameraConfig;
pub use loader::{load_config, parse_config};
pub use machine::MachineConfig;
pub use motor::MotorConfig;
pub use pins::PinMap;
pub use timing::TimingConfig;
pub use validation::validate_config;

// Re-export unit types at config level
pub use units::{DutyPercent, MicrostepLevels, Millis, Resolution};
