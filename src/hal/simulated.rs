//! Simulated machine for running without hardware.

use core::time::Duration;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use crate::config::{DutyPercent, MachineConfig};
use crate::error::HardwareError;
use crate::framing::{CropRegion, SensorSize};

use super::camera::{Camera, PlaceholderCamera};
use super::{Direction, HardwareDriver};

/// Observable state of the simulated machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedHardware {
    /// Illumination LED.
    pub led: bool,
    /// Motor driver enabled.
    pub motor_energized: bool,
    /// Last direction set.
    pub direction: Option<Direction>,
    /// Last crop pushed to the camera.
    pub crop: Option<CropRegion>,
    /// Times the motor was started.
    pub motor_starts: u32,
    /// Frame edges emitted.
    pub edges: u64,
    /// Stills written to disk.
    pub captures: u64,
    /// Between initialize and release.
    pub initialized: bool,
}

/// Shared view of a [`SimulatedDriver`] for inspection after it has been
/// handed to a controller.
#[derive(Debug, Clone, Default)]
pub struct SimulationProbe(Arc<Mutex<SimulatedHardware>>);

impl SimulationProbe {
    /// Copy of the current simulated state.
    pub fn snapshot(&self) -> SimulatedHardware {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedHardware> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hardware driver that emits one frame edge per `frame_period` while the
/// motor runs and captures placeholder images.
///
/// Uses the tokio clock, so paused-time tests run instantly and
/// deterministically.
#[derive(Debug)]
pub struct SimulatedDriver {
    probe: SimulationProbe,
    camera: PlaceholderCamera,
    frame_period: Duration,
    next_edge: Option<Instant>,
    stall: bool,
}

impl SimulatedDriver {
    /// Create a simulated machine with the given time per frame.
    pub fn new(frame_period: Duration, sensor: SensorSize) -> Self {
        Self {
            probe: SimulationProbe::default(),
            camera: PlaceholderCamera::new(sensor),
            frame_period,
            next_edge: None,
            stall: false,
        }
    }

    /// Create a simulated machine from configuration. The sensor matches the
    /// configured output resolution.
    pub fn from_config(config: &MachineConfig) -> Self {
        let res = config.camera.resolution;
        Self::new(
            config.timing.simulated_frame_ms.as_duration(),
            SensorSize::new(res.width, res.height),
        )
    }

    /// Make the transport jam: the motor runs but no frame edges arrive.
    pub fn jammed(mut self) -> Self {
        self.stall = true;
        self
    }

    /// Handle for inspecting the simulated state.
    pub fn probe(&self) -> SimulationProbe {
        self.probe.clone()
    }
}

impl HardwareDriver for SimulatedDriver {
    fn initialize(&mut self) -> Result<SensorSize, HardwareError> {
        let mut hw = self.probe.lock();
        hw.led = false;
        hw.motor_energized = false;
        hw.initialized = true;
        self.next_edge = None;
        self.camera.start()?;
        self.camera.sensor_size()
    }

    fn release(&mut self) -> Result<bool, HardwareError> {
        let mut hw = self.probe.lock();
        if !hw.initialized {
            return Ok(false);
        }
        hw.led = false;
        hw.motor_energized = false;
        hw.initialized = false;
        self.next_edge = None;
        self.camera.close()?;
        Ok(true)
    }

    fn set_led(&mut self, on: bool) -> Result<(), HardwareError> {
        self.probe.lock().led = on;
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareError> {
        self.probe.lock().direction = Some(direction);
        Ok(())
    }

    fn start_motor(&mut self, _duty: DutyPercent) -> Result<(), HardwareError> {
        let mut hw = self.probe.lock();
        hw.motor_energized = true;
        hw.motor_starts += 1;
        self.next_edge = Some(Instant::now() + self.frame_period);
        Ok(())
    }

    fn stop_motor(&mut self) -> Result<(), HardwareError> {
        self.probe.lock().motor_energized = false;
        self.next_edge = None;
        Ok(())
    }

    fn motor_energized(&self) -> bool {
        self.probe.lock().motor_energized
    }

    fn poll_frame_edge(&mut self) -> Result<bool, HardwareError> {
        if self.stall {
            return Ok(false);
        }
        let Some(due) = self.next_edge else {
            return Ok(false);
        };
        if Instant::now() < due {
            return Ok(false);
        }

        self.next_edge = Some(due + self.frame_period);
        self.probe.lock().edges += 1;
        Ok(true)
    }

    fn set_crop(&mut self, crop: CropRegion) -> Result<(), HardwareError> {
        self.probe.lock().crop = Some(crop);
        self.camera.set_crop(crop)
    }

    fn capture_to_file(&mut self, path: &Path) -> Result<(), HardwareError> {
        self.camera.capture_file(path)?;
        self.probe.lock().captures += 1;
        Ok(())
    }

    fn capture_to_memory(&mut self) -> Result<Vec<u8>, HardwareError> {
        self.camera.capture_jpeg()
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
