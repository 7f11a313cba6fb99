//! # cineroll
//!
//! Frame-synchronized motion and capture control for a motorized Super-8
//! film digitizer, with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Frame-counted transport**: advance and rewind by counting falling
//!   edges of a rotation sensor, never by step count
//! - **Capture runs**: one still per frame, cancellable, run in the background
//! - **Motor safety**: the motor is switched off whenever an operation ends,
//!   including on error, cancellation or a dropped future
//! - **Framing**: clamped zoom/pan mapped to a camera crop region that always
//!   fits the sensor
//! - **Configuration-driven**: wiring, motor, camera and timing in TOML
//! - **Simulation**: a simulated machine for running without hardware
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cineroll::{MotionCaptureController, SimulatedDriver};
//!
//! let config = cineroll::load_config("cineroll.toml")?;
//! let controller = MotionCaptureController::new(SimulatedDriver::from_config(&config), config);
//! controller.initialize()?;
//!
//! controller.set_zoom(1);
//! controller.advance_frames(1).await?;
//!
//! let run = controller.start_capture(24, "scans/reel-01").await?;
//! // ... later, from another clone of the controller
//! controller.stop_capture();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Config errors carry heapless strings inline
#![allow(clippy::result_large_err)]

// Core modules
pub mod config;
pub mod controller;
pub mod error;
pub mod framing;
pub mod hal;

// Re-exports for ergonomic API
pub use config::{load_config, parse_config, validate_config, MachineConfig};
pub use controller::{
    CaptureOutcome, CaptureState, CaptureTask, ControllerStatus, MotionCaptureController,
    Operation,
};
pub use error::{CaptureError, ConfigError, Error, HardwareError, Result};
pub use framing::{CropRegion, Framing, SensorSize};
pub use hal::{Direction, GpioDriver, HardwareDriver, SimulatedDriver};
