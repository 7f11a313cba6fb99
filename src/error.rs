//! Error types for cineroll.
//!
//! Provides unified error handling across configuration, hardware access and
//! capture runs.

use std::path::PathBuf;

use thiserror::Error;

use crate::controller::Operation;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all controller operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Configuration parsing or validation error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Pin, PWM, edge-detection or camera failure
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),
    /// Capture run could not start or aborted
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Hardware has not been initialized (or was already cleaned up)
    #[error("Hardware not initialized")]
    NotInitialized,
    /// Another motion or capture operation owns the motor
    #[error("Controller busy: {0} in progress")]
    Busy(Operation),
    /// No frame edge arrived within the stall timeout
    #[error("Motion stalled after {moved} of {requested} frames")]
    StalledMotion {
        /// Frames counted before the stall
        moved: u32,
        /// Frames requested
        requested: u32,
    },
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    #[error("Parse error: {0}")]
    ParseError(heapless::String<128>),
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(heapless::String<128>),
    /// PWM duty cycle outside 1-100
    #[error("Invalid duty cycle: {0}%. Must be 1-100")]
    InvalidDutyCycle(u8),
    /// PWM frequency of zero
    #[error("Invalid PWM frequency: {0} Hz. Must be > 0")]
    InvalidPwmFrequency(u32),
    /// Zoom or pan step must be positive and finite
    #[error("Invalid {axis} step: {value}. Must be > 0")]
    InvalidStep {
        /// Which step (`zoom` or `pan`)
        axis: &'static str,
        /// Offending value
        value: f64,
    },
    /// Default framing outside its clamp range
    #[error("Default {axis} {value} outside [{min}, {max}]")]
    FramingOutOfRange {
        /// Which parameter (`zoom`, `pan_h`, `pan_v`)
        axis: &'static str,
        /// Offending value
        value: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Camera resolution with a zero dimension
    #[error("Invalid resolution {width}x{height}")]
    InvalidResolution {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Poll interval of zero would spin the scheduler
    #[error("Poll interval must be > 0 ms")]
    InvalidPollInterval,
    /// Image extension empty or not alphanumeric
    #[error("Invalid image extension: '{0}'")]
    InvalidImageExtension(heapless::String<16>),
    /// Same BCM pin assigned to two functions
    #[error("Pin {pin} assigned to both {first} and {second}")]
    DuplicatePin {
        /// BCM pin number
        pin: u8,
        /// First function using the pin
        first: &'static str,
        /// Second function using the pin
        second: &'static str,
    },
    /// A required driver component was not supplied to a builder
    #[error("{0} is required")]
    MissingComponent(&'static str),
}

/// Hardware access errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HardwareError {
    /// GPIO output or input operation failed
    #[error("GPIO pin operation failed on {0}")]
    Pin(&'static str),
    /// PWM duty cycle update failed
    #[error("PWM operation failed")]
    Pwm,
    /// Edge detection could not be armed or polled
    #[error("Edge detection failed: {0}")]
    EdgeDetection(String),
    /// Camera device failure
    #[error("Camera failure: {0}")]
    Camera(String),
    /// Setup-time failure
    #[error("Initialization failed: {0}")]
    Initialization(String),
    /// File system failure in a capture primitive
    #[error("I/O failure: {0}")]
    Io(String),
}

/// Capture run errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// Output directory could not be created
    #[error("Cannot create output directory {}: {reason}", .path.display())]
    DirectoryCreation {
        /// Requested directory
        path: PathBuf,
        /// Underlying I/O message
        reason: String,
    },
    /// A capture run needs at least one frame
    #[error("Frame count must be > 0")]
    InvalidFrameCount,
    /// The background run ended without reporting (panicked or was aborted)
    #[error("Capture run aborted: {0}")]
    Aborted(String),
}

/// Copy a message into a bounded string, truncating at a char boundary.
pub(crate) fn bounded<const N: usize>(msg: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in msg.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
