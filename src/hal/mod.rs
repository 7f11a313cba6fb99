//! Hardware abstraction for the digitizer.
//!
//! The controller talks to the machine only through [`HardwareDriver`]. Two
//! implementations exist: [`GpioDriver`], built from embedded-hal 1.0 pins and
//! a [`Camera`], and [`SimulatedDriver`] for running without hardware. The
//! driver is chosen once at startup.

mod camera;
mod edge;
mod gpio;
mod simulated;

use std::path::Path;

use serde::Serialize;

use crate::config::DutyPercent;
use crate::error::HardwareError;
use crate::framing::{CropRegion, SensorSize};

pub use camera::{Camera, PlaceholderCamera};
pub use edge::{EdgeLatch, EdgeSource, LatchedEdge, SampledEdge};
pub use gpio::{
    GpioDriver, GpioDriverBuilder, PinProvider, StepSignal, DEFAULT_STEP_FREQUENCY_HZ,
};
pub use simulated::{SimulatedDriver, SimulatedHardware, SimulationProbe};

/// Film transport direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward the take-up reel (frame position increases).
    Forward,
    /// Back toward the supply reel (frame position decreases).
    Reverse,
}

impl Direction {
    /// Get the sign multiplier for the frame counter.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// Narrow interface between the controller and the machine.
///
/// Setup calls may fail; runtime calls that fail abort the current
/// operation, but [`HardwareDriver::stop_motor`] is still attempted.
pub trait HardwareDriver: Send {
    /// Set microstepping, force the motor off and the LED off, re-arm frame
    /// edge detection and bring the camera online.
    ///
    /// Returns the sensor size used for crop math.
    fn initialize(&mut self) -> Result<SensorSize, HardwareError>;

    /// Release everything acquired so far. Safe after a partial
    /// [`HardwareDriver::initialize`]; returns `false` when nothing was held.
    fn release(&mut self) -> Result<bool, HardwareError>;

    /// Switch the illumination LED.
    fn set_led(&mut self, on: bool) -> Result<(), HardwareError>;

    /// Set the direction pin for the next motor run.
    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareError>;

    /// Assert enable and start the step signal.
    fn start_motor(&mut self, duty: DutyPercent) -> Result<(), HardwareError>;

    /// Stop the step signal and deassert enable.
    fn stop_motor(&mut self) -> Result<(), HardwareError>;

    /// Whether the motor driver is currently enabled.
    fn motor_energized(&self) -> bool;

    /// Consume one debounced falling edge of the rotation sensor, if any.
    fn poll_frame_edge(&mut self) -> Result<bool, HardwareError>;

    /// Push a crop region to the camera.
    fn set_crop(&mut self, crop: CropRegion) -> Result<(), HardwareError>;

    /// Capture a still straight to `path`.
    fn capture_to_file(&mut self, path: &Path) -> Result<(), HardwareError>;

    /// Capture a still and return it encoded in memory.
    fn capture_to_memory(&mut self) -> Result<Vec<u8>, HardwareError>;

    /// Whether this driver simulates the machine.
    fn is_simulated(&self) -> bool {
        false
    }
}

impl<D: HardwareDriver + ?Sized> HardwareDriver for Box<D> {
    fn initialize(&mut self) -> Result<SensorSize, HardwareError> {
        (**self).initialize()
    }

    fn release(&mut self) -> Result<bool, HardwareError> {
        (**self).release()
    }

    fn set_led(&mut self, on: bool) -> Result<(), HardwareError> {
        (**self).set_led(on)
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareError> {
        (**self).set_direction(direction)
    }

    fn start_motor(&mut self, duty: DutyPercent) -> Result<(), HardwareError> {
        (**self).start_motor(duty)
    }

    fn stop_motor(&mut self) -> Result<(), HardwareError> {
        (**self).stop_motor()
    }

    fn motor_energized(&self) -> bool {
        (**self).motor_energized()
    }

    fn poll_frame_edge(&mut self) -> Result<bool, HardwareError> {
        (**self).poll_frame_edge()
    }

    fn set_crop(&mut self, crop: CropRegion) -> Result<(), HardwareError> {
        (**self).set_crop(crop)
    }

    fn capture_to_file(&mut self, path: &Path) -> Result<(), HardwareError> {
        (**self).capture_to_file(path)
    }

    fn capture_to_memory(&mut self) -> Result<Vec<u8>, HardwareError> {
        (**self).capture_to_memory()
    }

    fn is_simulated(&self) -> bool {
        (**self).is_simulated()
    }
}
