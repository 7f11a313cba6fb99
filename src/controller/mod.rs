//! Motion and capture control.
//!
//! [`MotionCaptureController`] owns the hardware driver and all state facing
//! it. Only one motor operation (advance, rewind or a capture run) may hold
//! the motor at a time; the motor is switched off whenever that operation
//! ends, however it ends.

mod capture;
mod motion;
mod state;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::MachineConfig;
use crate::error::{Error, Result};
use crate::framing::{CropRegion, Framing};
use crate::hal::HardwareDriver;

pub use capture::{CaptureOutcome, CaptureTask};
pub use state::{CaptureState, ControllerStatus, Operation};

use state::ControllerState;

struct Shared<D> {
    driver: Mutex<D>,
    state: Mutex<ControllerState>,
    /// One permit: the motor.
    slot: Arc<Semaphore>,
    config: MachineConfig,
    mock_mode: bool,
}

impl<D> Shared<D> {
    fn driver(&self) -> MutexGuard<'_, D> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_error(&self, err: &Error) {
        error!(error = %err, "operation failed");
        self.state().last_error = Some(err.to_string());
    }
}

/// Frame-synchronized motion and capture controller.
///
/// Cheap to clone; clones share the same machine, so one clone can serve
/// status and stop requests while another drives a capture run.
///
/// # Example
///
/// ```rust,ignore
/// use cineroll::{MachineConfig, MotionCaptureController, SimulatedDriver};
///
/// let config = MachineConfig::default();
/// let controller = MotionCaptureController::new(SimulatedDriver::from_config(&config), config);
/// controller.initialize()?;
///
/// controller.advance_frames(3).await?;
/// if let Some(run) = controller.start_capture(5, "scans/reel-01").await? {
///     println!("{:?}", run.wait().await);
/// }
/// controller.cleanup().await?;
/// ```
pub struct MotionCaptureController<D> {
    shared: Arc<Shared<D>>,
}

impl<D> Clone for MotionCaptureController<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D: HardwareDriver + 'static> MotionCaptureController<D> {
    /// Create a controller around `driver`. No hardware I/O happens until
    /// [`initialize`](Self::initialize).
    pub fn new(driver: D, config: MachineConfig) -> Self {
        let mock_mode = driver.is_simulated();
        let framing = Framing::from_config(&config.camera);

        Self {
            shared: Arc::new(Shared {
                driver: Mutex::new(driver),
                state: Mutex::new(ControllerState::new(framing)),
                slot: Arc::new(Semaphore::new(1)),
                config,
                mock_mode,
            }),
        }
    }

    /// Get the machine configuration.
    #[inline]
    pub fn config(&self) -> &MachineConfig {
        &self.shared.config
    }

    /// Whether the hardware is initialized.
    pub fn is_initialized(&self) -> bool {
        self.shared.state().initialized
    }

    /// Bring the hardware up: microstepping, motor off, LED off, edge
    /// detection armed and camera online.
    ///
    /// Does nothing if already initialized. On failure whatever was acquired
    /// is released and the controller stays uninitialized.
    pub fn initialize(&self) -> Result<()> {
        if self.is_initialized() {
            debug!("already initialized");
            return Ok(());
        }

        let mut driver = self.shared.driver();
        let sensor = match driver.initialize() {
            Ok(sensor) => sensor,
            Err(e) => {
                if let Err(release) = driver.release() {
                    warn!(error = %release, "release after failed initialization");
                }
                drop(driver);
                let err = Error::from(e);
                self.shared.record_error(&err);
                return Err(err);
            }
        };

        let crop = {
            let mut state = self.shared.state();
            state.sensor = Some(sensor);
            state.led_on = false;
            state.framing.crop(sensor)
        };
        if let Err(e) = driver.set_crop(crop) {
            if let Err(release) = driver.release() {
                warn!(error = %release, "release after failed initialization");
            }
            drop(driver);
            self.shared.state().sensor = None;
            let err = Error::from(e);
            self.shared.record_error(&err);
            return Err(err);
        }
        drop(driver);

        self.shared.state().initialized = true;
        info!(
            width = sensor.width,
            height = sensor.height,
            mock = self.shared.mock_mode,
            "hardware initialized"
        );
        Ok(())
    }

    /// Stop any capture run, wait for the motor to be released, then release
    /// the hardware. Does nothing if not initialized.
    pub async fn cleanup(&self) -> Result<()> {
        if !self.is_initialized() {
            debug!("cleanup: nothing to release");
            return Ok(());
        }

        if self.shared.state().capture_active {
            self.stop_capture();
        }

        // Blocks new operations while the hardware goes away. The slot is
        // never closed, so acquisition only fails if that changes.
        let _permit = self.shared.slot.acquire().await.ok();

        let result = {
            let mut driver = self.shared.driver();
            if let Err(e) = driver.stop_motor() {
                warn!(error = %e, "cleanup: stopping motor");
            }
            driver.release()
        };

        {
            let mut state = self.shared.state();
            state.initialized = false;
            state.led_on = false;
            state.sensor = None;
        }

        match result {
            Ok(_) => {
                info!("hardware cleaned up");
                Ok(())
            }
            Err(e) => {
                let err = Error::from(e);
                self.shared.record_error(&err);
                Err(err)
            }
        }
    }

    /// Switch the LED on.
    pub fn led_on(&self) -> Result<()> {
        self.set_led(true)
    }

    /// Switch the LED off.
    pub fn led_off(&self) -> Result<()> {
        self.set_led(false)
    }

    /// Toggle the LED and return its new state.
    pub fn led_toggle(&self) -> Result<bool> {
        self.ensure_initialized()?;
        let mut driver = self.shared.driver();
        let on = !self.shared.state().led_on;
        driver.set_led(on)?;
        self.shared.state().led_on = on;
        debug!(on, "led toggled");
        Ok(on)
    }

    fn set_led(&self, on: bool) -> Result<()> {
        self.ensure_initialized()?;
        let mut driver = self.shared.driver();
        driver.set_led(on)?;
        self.shared.state().led_on = on;
        debug!(on, "led");
        Ok(())
    }

    /// Nudge zoom by one step; `direction = +1` zooms in. Returns the new zoom.
    pub fn set_zoom(&self, direction: i32) -> f64 {
        let (zoom, crop) = {
            let mut state = self.shared.state();
            let zoom = state.framing.nudge_zoom(direction);
            (zoom, self.pending_crop(&state))
        };
        self.push_crop(crop);
        zoom
    }

    /// Nudge pan by whole steps. Returns the new `(pan_h, pan_v)`.
    pub fn set_pan(&self, dx: i32, dy: i32) -> (f64, f64) {
        let (pan, crop) = {
            let mut state = self.shared.state();
            let pan = state.framing.nudge_pan(dx, dy);
            (pan, self.pending_crop(&state))
        };
        self.push_crop(crop);
        pan
    }

    /// Crop region for the current framing, once the sensor size is known.
    pub fn crop_region(&self) -> Option<CropRegion> {
        let state = self.shared.state();
        state.sensor.map(|sensor| state.framing.crop(sensor))
    }

    fn pending_crop(&self, state: &ControllerState) -> Option<CropRegion> {
        if !state.initialized {
            return None;
        }
        state.sensor.map(|sensor| state.framing.crop(sensor))
    }

    fn push_crop(&self, crop: Option<CropRegion>) {
        let Some(crop) = crop else {
            return;
        };
        let result = self.shared.driver().set_crop(crop);
        match result {
            Ok(()) => debug!(?crop, "crop updated"),
            Err(e) => self.shared.record_error(&Error::from(e)),
        }
    }

    /// Grab an encoded still for live preview.
    pub fn get_preview_frame(&self) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        let frame = self.shared.driver().capture_to_memory()?;
        Ok(frame)
    }

    /// Capture a still straight to `path`.
    pub fn capture_image<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.ensure_initialized()?;
        self.shared.driver().capture_to_file(path.as_ref())?;
        Ok(())
    }

    /// Snapshot of the full controller state. Never fails.
    pub fn get_status(&self) -> ControllerStatus {
        let motor_energized = self.shared.driver().motor_energized();
        let state = self.shared.state();
        let (pan_x, pan_y) = state.framing.pan();

        ControllerStatus {
            led: state.led_on,
            zoom_level: state.framing.zoom(),
            pan_x,
            pan_y,
            frame_position: state.frame_position,
            capture_active: state.capture_active,
            capture_target: state.capture_target,
            capture_count: state.capture_count,
            stop_requested: state.stop_requested,
            capture_state: state.capture_state,
            operation: state.operation,
            motor_energized,
            mock_mode: self.shared.mock_mode,
            initialized: state.initialized,
            error: state.last_error.clone(),
        }
    }

    /// Forget the last recorded error.
    pub fn clear_error(&self) {
        self.shared.state().last_error = None;
    }

    /// Relative frame counter.
    pub fn frame_position(&self) -> i64 {
        self.shared.state().frame_position
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.shared.state().initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }
}
