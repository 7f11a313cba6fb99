//! GPIO-backed hardware driver.
//!
//! Generic over embedded-hal 1.0 pin types so any platform binding (or a mock)
//! can drive the machine.

use core::time::Duration;
use std::path::Path;

use embedded_hal::digital::{InputPin, OutputPin, PinState};
use embedded_hal::pwm::SetDutyCycle;

use crate::config::{DutyPercent, MachineConfig, MicrostepLevels, PinMap, Resolution};
use crate::error::{ConfigError, HardwareError, Result};
use crate::framing::{CropRegion, SensorSize};

use super::camera::Camera;
use super::edge::{EdgeSource, SampledEdge};
use super::{Direction, HardwareDriver};

/// Stock step frequency of the machine, in Hz.
pub const DEFAULT_STEP_FREQUENCY_HZ: u32 = 3000;

/// PWM channel driving the STEP input, with an adjustable frequency.
pub trait StepSignal: SetDutyCycle {
    /// Set the output frequency.
    fn set_frequency_hz(&mut self, hz: u32) -> core::result::Result<(), Self::Error>;
}

/// Opens platform pins by BCM number.
pub trait PinProvider {
    /// Output pin type.
    type Output: OutputPin;
    /// Input pin type.
    type Input: InputPin;
    /// PWM step channel type.
    type Step: StepSignal;

    /// Claim a pin as an output.
    fn output(&mut self, bcm: u8) -> core::result::Result<Self::Output, HardwareError>;

    /// Claim a pin as an input.
    fn input(&mut self, bcm: u8) -> core::result::Result<Self::Input, HardwareError>;

    /// Claim a pin as the PWM step channel.
    fn step(&mut self, bcm: u8) -> core::result::Result<Self::Step, HardwareError>;
}

fn opened<T>(
    name: &str,
    bcm: u8,
    pin: core::result::Result<T, HardwareError>,
) -> core::result::Result<T, HardwareError> {
    pin.map_err(|e| {
        HardwareError::Initialization(format!("cannot open {name} on BCM {bcm}: {e}"))
    })
}

/// Hardware driver over GPIO pins, a PWM step channel, a frame-edge source
/// and a camera.
///
/// Generic over:
/// - `OUT`: output pin type for direction, enable, LED and MS1..MS3
/// - `PWM`: step signal channel (must implement [`StepSignal`])
/// - `EDGE`: rotation sensor edge source
/// - `CAM`: camera device
///
/// Pin directions are fixed by the pin types themselves; `initialize` only
/// sets levels. The enable input is active-low.
pub struct GpioDriver<OUT, PWM, EDGE, CAM>
where
    OUT: OutputPin,
    PWM: StepSignal,
    EDGE: EdgeSource,
    CAM: Camera,
{
    direction: OUT,
    enable: OUT,
    led: OUT,
    microstep: [OUT; 3],
    step: PWM,
    sensor: EDGE,
    camera: CAM,

    microstep_levels: MicrostepLevels,
    pwm_frequency_hz: u32,
    resolution: Resolution,
    debounce: Duration,
    invert_direction: bool,

    energized: bool,
    pins_ready: bool,
    camera_open: bool,
}

impl<OUT, PWM, EDGE, CAM> GpioDriver<OUT, PWM, EDGE, CAM>
where
    OUT: OutputPin,
    PWM: StepSignal,
    EDGE: EdgeSource,
    CAM: Camera,
{
    /// Start building a driver.
    pub fn builder() -> GpioDriverBuilder<OUT, PWM, EDGE, CAM> {
        GpioDriverBuilder::new()
    }

    /// Access the camera.
    pub fn camera(&self) -> &CAM {
        &self.camera
    }

    fn write(pin: &mut OUT, name: &'static str, high: bool) -> core::result::Result<(), HardwareError> {
        pin.set_state(PinState::from(high))
            .map_err(|_| HardwareError::Pin(name))
    }
}

impl<OUT, PWM, EDGE, CAM> HardwareDriver for GpioDriver<OUT, PWM, EDGE, CAM>
where
    OUT: OutputPin + Send,
    PWM: StepSignal + Send,
    EDGE: EdgeSource,
    CAM: Camera,
{
    fn initialize(&mut self) -> core::result::Result<SensorSize, HardwareError> {
        for (pin, high) in self.microstep.iter_mut().zip(self.microstep_levels.levels()) {
            Self::write(pin, "microstep", high)?;
        }

        // Motor off, light off
        Self::write(&mut self.enable, "enable", true)?;
        self.energized = false;
        Self::write(&mut self.led, "led", false)?;
        self.step
            .set_frequency_hz(self.pwm_frequency_hz)
            .map_err(|_| HardwareError::Pwm)?;
        self.step
            .set_duty_cycle_fully_off()
            .map_err(|_| HardwareError::Pwm)?;
        self.pins_ready = true;

        // A previous run may have left detection armed
        self.sensor.clear();
        self.sensor.arm(self.debounce)?;

        self.camera.configure(self.resolution)?;
        self.camera.start()?;
        self.camera_open = true;

        self.camera.sensor_size()
    }

    fn release(&mut self) -> core::result::Result<bool, HardwareError> {
        if !self.pins_ready && !self.camera_open {
            return Ok(false);
        }

        let mut first_err = None;

        if self.pins_ready {
            if let Err(e) = self.stop_motor() {
                first_err.get_or_insert(e);
            }
            if let Err(e) = Self::write(&mut self.led, "led", false) {
                first_err.get_or_insert(e);
            }
            self.sensor.clear();
            self.pins_ready = false;
        }

        if self.camera_open {
            if let Err(e) = self.camera.stop().and_then(|()| self.camera.close()) {
                first_err.get_or_insert(e);
            }
            self.camera_open = false;
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }

    fn set_led(&mut self, on: bool) -> core::result::Result<(), HardwareError> {
        Self::write(&mut self.led, "led", on)
    }

    fn set_direction(&mut self, direction: Direction) -> core::result::Result<(), HardwareError> {
        let high = (direction == Direction::Reverse) != self.invert_direction;
        Self::write(&mut self.direction, "direction", high)
    }

    fn start_motor(&mut self, duty: DutyPercent) -> core::result::Result<(), HardwareError> {
        Self::write(&mut self.enable, "enable", false)?;
        self.energized = true;
        self.step
            .set_duty_cycle_percent(duty.value())
            .map_err(|_| HardwareError::Pwm)
    }

    fn stop_motor(&mut self) -> core::result::Result<(), HardwareError> {
        // Attempt both even if the PWM write fails
        let pwm = self
            .step
            .set_duty_cycle_fully_off()
            .map_err(|_| HardwareError::Pwm);
        let enable = Self::write(&mut self.enable, "enable", true);
        if enable.is_ok() {
            self.energized = false;
        }
        pwm.and(enable)
    }

    fn motor_energized(&self) -> bool {
        self.energized
    }

    fn poll_frame_edge(&mut self) -> core::result::Result<bool, HardwareError> {
        self.sensor.poll()
    }

    fn set_crop(&mut self, crop: CropRegion) -> core::result::Result<(), HardwareError> {
        self.camera.set_crop(crop)
    }

    fn capture_to_file(&mut self, path: &Path) -> core::result::Result<(), HardwareError> {
        self.camera.capture_file(path)
    }

    fn capture_to_memory(&mut self) -> core::result::Result<Vec<u8>, HardwareError> {
        self.camera.capture_jpeg()
    }
}

/// Builder for creating GpioDriver instances.
pub struct GpioDriverBuilder<OUT, PWM, EDGE, CAM>
where
    OUT: OutputPin,
    PWM: StepSignal,
    EDGE: EdgeSource,
    CAM: Camera,
{
    direction: Option<OUT>,
    enable: Option<OUT>,
    led: Option<OUT>,
    microstep: Option<[OUT; 3]>,
    step: Option<PWM>,
    sensor: Option<EDGE>,
    camera: Option<CAM>,
    microstep_levels: MicrostepLevels,
    pwm_frequency_hz: u32,
    resolution: Resolution,
    debounce: Duration,
    invert_direction: bool,
}

impl<OUT, PWM, EDGE, CAM> Default for GpioDriverBuilder<OUT, PWM, EDGE, CAM>
where
    OUT: OutputPin,
    PWM: StepSignal,
    EDGE: EdgeSource,
    CAM: Camera,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<OUT, PWM, EDGE, CAM> GpioDriverBuilder<OUT, PWM, EDGE, CAM>
where
    OUT: OutputPin,
    PWM: StepSignal,
    EDGE: EdgeSource,
    CAM: Camera,
{
    /// Create a new builder with the stock machine settings.
    pub fn new() -> Self {
        Self {
            direction: None,
            enable: None,
            led: None,
            microstep: None,
            step: None,
            sensor: None,
            camera: None,
            microstep_levels: MicrostepLevels::FINE,
            pwm_frequency_hz: DEFAULT_STEP_FREQUENCY_HZ,
            resolution: Resolution::PAL,
            debounce: Duration::from_millis(500),
            invert_direction: false,
        }
    }

    /// Set the direction pin.
    pub fn direction_pin(mut self, pin: OUT) -> Self {
        self.direction = Some(pin);
        self
    }

    /// Set the active-low enable pin.
    pub fn enable_pin(mut self, pin: OUT) -> Self {
        self.enable = Some(pin);
        self
    }

    /// Set the LED pin.
    pub fn led_pin(mut self, pin: OUT) -> Self {
        self.led = Some(pin);
        self
    }

    /// Set the MS1..MS3 pins.
    pub fn microstep_pins(mut self, pins: [OUT; 3]) -> Self {
        self.microstep = Some(pins);
        self
    }

    /// Set the PWM step channel.
    pub fn step_pwm(mut self, pwm: PWM) -> Self {
        self.step = Some(pwm);
        self
    }

    /// Set the step frequency applied on initialize.
    pub fn step_frequency(mut self, hz: u32) -> Self {
        self.pwm_frequency_hz = hz;
        self
    }

    /// Set the rotation sensor edge source.
    pub fn frame_sensor(mut self, sensor: EDGE) -> Self {
        self.sensor = Some(sensor);
        self
    }

    /// Set the camera.
    pub fn camera(mut self, camera: CAM) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Set the debounce window of the rotation sensor.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set direction inversion.
    pub fn invert_direction(mut self, invert: bool) -> Self {
        self.invert_direction = invert;
        self
    }

    /// Configure levels, step frequency, resolution and timing from a
    /// MachineConfig.
    pub fn from_config(mut self, config: &MachineConfig) -> Self {
        self.microstep_levels = config.motor.microstep_levels;
        self.pwm_frequency_hz = config.motor.pwm_frequency_hz;
        self.invert_direction = config.motor.invert_direction;
        self.resolution = config.camera.resolution;
        self.debounce = config.timing.debounce_ms.as_duration();
        self
    }

    /// Build the GpioDriver.
    ///
    /// # Errors
    ///
    /// Returns an error if any pin, the PWM channel, the sensor or the camera
    /// is missing.
    pub fn build(self) -> Result<GpioDriver<OUT, PWM, EDGE, CAM>> {
        let direction = self
            .direction
            .ok_or(ConfigError::MissingComponent("direction pin"))?;
        let enable = self
            .enable
            .ok_or(ConfigError::MissingComponent("enable pin"))?;
        let led = self.led.ok_or(ConfigError::MissingComponent("led pin"))?;
        let microstep = self
            .microstep
            .ok_or(ConfigError::MissingComponent("microstep pins"))?;
        let step = self
            .step
            .ok_or(ConfigError::MissingComponent("step pwm"))?;
        let sensor = self
            .sensor
            .ok_or(ConfigError::MissingComponent("frame sensor"))?;
        let camera = self
            .camera
            .ok_or(ConfigError::MissingComponent("camera"))?;

        Ok(GpioDriver {
            direction,
            enable,
            led,
            microstep,
            step,
            sensor,
            camera,
            microstep_levels: self.microstep_levels,
            pwm_frequency_hz: self.pwm_frequency_hz,
            resolution: self.resolution,
            debounce: self.debounce,
            invert_direction: self.invert_direction,
            energized: false,
            pins_ready: false,
            camera_open: false,
        })
    }
}

impl<OUT, PWM, IN, CAM> GpioDriverBuilder<OUT, PWM, SampledEdge<IN>, CAM>
where
    OUT: OutputPin,
    PWM: StepSignal,
    IN: InputPin + Send,
    CAM: Camera,
{
    /// Claim every pin in `pins` from the platform.
    ///
    /// The frame sensor is wrapped in a [`SampledEdge`].
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Initialization`] naming the first pin that
    /// could not be claimed.
    pub fn open_pins<P>(mut self, provider: &mut P, pins: &PinMap) -> Result<Self>
    where
        P: PinProvider<Output = OUT, Input = IN, Step = PWM>,
    {
        let [ms1, ms2, ms3] = pins.microstep;

        let step = opened("step", pins.step, provider.step(pins.step))?;
        let direction = opened("direction", pins.direction, provider.output(pins.direction))?;
        let enable = opened("enable", pins.enable, provider.output(pins.enable))?;
        let led = opened("led", pins.led, provider.output(pins.led))?;
        let microstep = [
            opened("ms1", ms1, provider.output(ms1))?,
            opened("ms2", ms2, provider.output(ms2))?,
            opened("ms3", ms3, provider.output(ms3))?,
        ];
        let sensor = opened(
            "frame_sensor",
            pins.frame_sensor,
            provider.input(pins.frame_sensor),
        )?;

        self.step = Some(step);
        self.direction = Some(direction);
        self.enable = Some(enable);
        self.led = Some(led);
        self.microstep = Some(microstep);
        self.sensor = Some(SampledEdge::new(sensor));
        Ok(self)
    }
}
