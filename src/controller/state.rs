//! Controller state record and its public status snapshot.

use core::fmt;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::framing::{Framing, SensorSize};

/// Operation currently holding the motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Moving film forward.
    Advance,
    /// Moving film back.
    Rewind,
    /// Capture run.
    Capture,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Advance => write!(f, "advance"),
            Operation::Rewind => write!(f, "rewind"),
            Operation::Capture => write!(f, "capture"),
        }
    }
}

/// Phase of the most recent capture run.
///
/// A terminal phase is kept until the next run starts so callers can read
/// how the last run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// No run since startup.
    #[default]
    Idle,
    /// Run in progress.
    Running,
    /// Reached the target count.
    Completed,
    /// Stopped by request.
    Cancelled,
    /// Aborted by an error.
    Failed,
}

impl CaptureState {
    /// Whether this is an end state of a run.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CaptureState::Completed | CaptureState::Cancelled | CaptureState::Failed
        )
    }
}

/// Mutable state owned by the controller.
#[derive(Debug, Default)]
pub(crate) struct ControllerState {
    pub led_on: bool,
    pub framing: Framing,
    /// Read once at initialization.
    pub sensor: Option<SensorSize>,
    pub frame_position: i64,
    pub capture_active: bool,
    pub capture_target: u32,
    pub capture_count: u32,
    pub stop_requested: bool,
    pub capture_state: CaptureState,
    pub operation: Option<Operation>,
    pub last_error: Option<String>,
    pub initialized: bool,
    /// Token of the running capture, if any.
    pub cancel: Option<CancellationToken>,
}

impl ControllerState {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            ..Self::default()
        }
    }
}

/// Read-only snapshot of the controller, as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerStatus {
    /// Illumination LED on.
    pub led: bool,
    /// Fraction of the sensor kept (smaller is more magnified).
    pub zoom_level: f64,
    /// Horizontal pan.
    pub pan_x: f64,
    /// Vertical pan.
    pub pan_y: f64,
    /// Relative frame counter.
    pub frame_position: i64,
    /// A capture run is executing and has not been asked to stop.
    pub capture_active: bool,
    /// Frames requested by the current or last run.
    pub capture_target: u32,
    /// Frames captured by the current or last run.
    pub capture_count: u32,
    /// Stop was requested since the last run started.
    pub stop_requested: bool,
    /// Phase of the current or last run.
    pub capture_state: CaptureState,
    /// Operation holding the motor.
    pub operation: Option<Operation>,
    /// Motor driver enabled right now.
    pub motor_energized: bool,
    /// Running against the simulated machine.
    pub mock_mode: bool,
    /// Hardware initialized.
    pub initialized: bool,
    /// Last recorded error.
    pub error: Option<String>,
}
