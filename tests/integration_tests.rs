//! Integration tests for cineroll.
//!
//! These tests drive the controller end to end against the simulated machine
//! on a paused tokio clock, so frame timing is deterministic.

use std::path::Path;
use std::time::Duration;

use cineroll::config::DutyPercent;
use cineroll::hal::SimulationProbe;
use cineroll::{
    CaptureOutcome, CaptureState, CropRegion, Direction, Error, HardwareDriver, HardwareError,
    MachineConfig, MotionCaptureController, Operation, SensorSize, SimulatedDriver,
};

// =============================================================================
// Helpers
// =============================================================================

fn simulated() -> (MotionCaptureController<SimulatedDriver>, SimulationProbe) {
    let config = MachineConfig::default();
    let driver = SimulatedDriver::from_config(&config);
    let probe = driver.probe();
    let controller = MotionCaptureController::new(driver, config);
    controller.initialize().expect("simulated machine initializes");
    (controller, probe)
}

fn frame_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("output dir readable")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Simulated machine whose camera fails after a number of stills, or fails
/// to come up for the first few initialize calls.
struct FailingCamera {
    inner: SimulatedDriver,
    remaining: u32,
    failed_opens: u32,
}

impl HardwareDriver for FailingCamera {
    fn initialize(&mut self) -> Result<SensorSize, HardwareError> {
        // Pins and detection come up before the camera does
        let sensor = self.inner.initialize()?;
        if self.failed_opens > 0 {
            self.failed_opens -= 1;
            return Err(HardwareError::Camera("no camera detected".into()));
        }
        Ok(sensor)
    }

    fn release(&mut self) -> Result<bool, HardwareError> {
        self.inner.release()
    }

    fn set_led(&mut self, on: bool) -> Result<(), HardwareError> {
        self.inner.set_led(on)
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareError> {
        self.inner.set_direction(direction)
    }

    fn start_motor(&mut self, duty: DutyPercent) -> Result<(), HardwareError> {
        self.inner.start_motor(duty)
    }

    fn stop_motor(&mut self) -> Result<(), HardwareError> {
        self.inner.stop_motor()
    }

    fn motor_energized(&self) -> bool {
        self.inner.motor_energized()
    }

    fn poll_frame_edge(&mut self) -> Result<bool, HardwareError> {
        self.inner.poll_frame_edge()
    }

    fn set_crop(&mut self, crop: CropRegion) -> Result<(), HardwareError> {
        self.inner.set_crop(crop)
    }

    fn capture_to_file(&mut self, path: &Path) -> Result<(), HardwareError> {
        if self.remaining == 0 {
            return Err(HardwareError::Camera("sensor timeout".into()));
        }
        self.remaining -= 1;
        self.inner.capture_to_file(path)
    }

    fn capture_to_memory(&mut self) -> Result<Vec<u8>, HardwareError> {
        self.inner.capture_to_memory()
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

// =============================================================================
// Framing
// =============================================================================

#[test]
fn scenario_a_zoom_in_ten_steps() {
    let (controller, probe) = simulated();

    let mut zoom = 0.0;
    for _ in 0..10 {
        zoom = controller.set_zoom(1);
    }

    assert!((zoom - 0.310).abs() < 1e-9);
    assert!((0.1..=1.0).contains(&controller.get_status().zoom_level));
    assert_eq!(probe.snapshot().crop, controller.crop_region());
}

#[test]
fn crop_stays_on_sensor_at_extremes() {
    let (controller, _probe) = simulated();
    let sensor = SensorSize::new(720, 576);

    for _ in 0..100 {
        controller.set_zoom(-1);
        controller.set_pan(1, 1);
    }
    let crop = controller.crop_region().unwrap();
    assert!(crop.fits(sensor));
    assert_eq!(crop.width, 720);

    for _ in 0..100 {
        controller.set_zoom(1);
        controller.set_pan(-1, -1);
    }
    let crop = controller.crop_region().unwrap();
    assert!(crop.fits(sensor));
    assert_eq!((crop.x, crop.y), (0, 0));
}

// =============================================================================
// Motion
// =============================================================================

#[tokio::test(start_paused = true)]
async fn frame_position_is_additive() {
    let (controller, _probe) = simulated();

    assert_eq!(controller.advance_frames(7).await.unwrap(), 7);
    assert_eq!(controller.rewind_frames(3).await.unwrap(), 3);
    assert_eq!(controller.frame_position(), 4);

    assert_eq!(controller.rewind_frames(6).await.unwrap(), 6);
    assert_eq!(controller.frame_position(), -2);
}

#[tokio::test(start_paused = true)]
async fn motion_rejected_during_capture() {
    let (controller, _probe) = simulated();
    let dir = tempfile::tempdir().unwrap();

    let task = controller.start_capture(20, dir.path()).await.unwrap().unwrap();
    assert_eq!(
        controller.advance_frames(1).await,
        Err(Error::Busy(Operation::Capture))
    );
    assert_eq!(controller.get_status().operation, Some(Operation::Capture));

    controller.stop_capture();
    task.wait().await;
    assert_eq!(controller.advance_frames(1).await.unwrap(), 1);
}

// =============================================================================
// Capture runs
// =============================================================================

#[tokio::test(start_paused = true)]
async fn scenario_b_capture_runs_to_completion() {
    let (controller, probe) = simulated();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reel-01");

    let task = controller.start_capture(5, &out).await.unwrap().unwrap();
    let outcome = task.wait().await;

    assert_eq!(outcome, CaptureOutcome::Completed { frames: 5 });
    let status = controller.get_status();
    assert_eq!(status.capture_count, 5);
    assert!(!status.capture_active);
    assert_eq!(status.capture_state, CaptureState::Completed);
    assert_eq!(
        frame_files(&out),
        ["0001.jpg", "0002.jpg", "0003.jpg", "0004.jpg", "0005.jpg"]
    );
    assert!(!probe.snapshot().motor_energized);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_stop_shortly_after_start() {
    let (controller, probe) = simulated();
    let dir = tempfile::tempdir().unwrap();

    let task = controller.start_capture(100, dir.path()).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(controller.stop_capture());
    assert!(!controller.get_status().capture_active);

    let outcome = task.wait().await;
    assert!(matches!(outcome, CaptureOutcome::Cancelled { .. }));

    let status = controller.get_status();
    assert!(status.capture_count < 100);
    assert_eq!(status.capture_count, outcome.frames());
    assert!(!status.capture_active);
    assert!(status.stop_requested);
    assert_eq!(status.capture_state, CaptureState::Cancelled);
    assert!(status.error.is_none());
    assert!(!probe.snapshot().motor_energized);
}

#[tokio::test(start_paused = true)]
async fn scenario_d_second_start_is_ignored() {
    let (controller, _probe) = simulated();
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let task = controller.start_capture(10, first.path()).await.unwrap().unwrap();
    let again = controller.start_capture(3, second.path()).await.unwrap();

    assert!(again.is_none());
    assert_eq!(controller.get_status().capture_target, 10);

    let outcome = task.wait().await;
    assert_eq!(outcome.frames(), 10);
    assert!(frame_files(second.path()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn capture_count_is_monotonic() {
    let (controller, _probe) = simulated();
    let dir = tempfile::tempdir().unwrap();

    let task = controller.start_capture(8, dir.path()).await.unwrap().unwrap();
    let mut last = 0;
    while !task.is_finished() {
        let status = controller.get_status();
        assert!(status.capture_count >= last);
        assert!(status.capture_count <= status.capture_target);
        last = status.capture_count;
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    assert_eq!(task.wait().await.frames(), 8);
}

#[tokio::test(start_paused = true)]
async fn stop_at_any_point_leaves_motor_off() {
    for delay_ms in [0u64, 5, 95, 100, 105, 420] {
        let (controller, probe) = simulated();
        let dir = tempfile::tempdir().unwrap();

        let task = controller.start_capture(50, dir.path()).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        controller.stop_capture();
        task.wait().await;

        assert!(!probe.snapshot().motor_energized, "delay {delay_ms} ms");
        assert!(controller.get_status().operation.is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn unusable_directory_fails_before_motion() {
    let (controller, probe) = simulated();
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();

    let err = controller
        .start_capture(5, blocker.join("frames"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Capture(_)));

    let status = controller.get_status();
    assert!(!status.capture_active);
    assert_eq!(status.capture_state, CaptureState::Failed);
    assert_eq!(status.error, Some(err.to_string()));
    assert!(status.operation.is_none());
    assert_eq!(probe.snapshot().motor_starts, 0);

    controller.clear_error();
    assert!(controller.get_status().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn camera_failure_ends_run_failed() {
    let config = MachineConfig::default();
    let inner = SimulatedDriver::from_config(&config);
    let probe = inner.probe();
    let controller = MotionCaptureController::new(FailingCamera {
            inner,
            remaining: 2,
            failed_opens: 0,
        }, config);
    controller.initialize().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let outcome = controller.run_capture(5, dir.path()).await.unwrap();

    assert!(matches!(
        outcome,
        CaptureOutcome::Failed {
            frames: 2,
            error: Error::Hardware(HardwareError::Camera(_)),
        }
    ));
    let status = controller.get_status();
    assert_eq!(status.capture_state, CaptureState::Failed);
    assert!(!status.capture_active);
    assert!(status.error.unwrap().contains("sensor timeout"));
    assert!(!probe.snapshot().motor_energized);
    assert_eq!(frame_files(dir.path()), ["0001.jpg", "0002.jpg"]);
}

#[tokio::test(start_paused = true)]
async fn failed_initialize_releases_hardware() {
    let config = MachineConfig::default();
    let inner = SimulatedDriver::from_config(&config);
    let probe = inner.probe();
    let driver = FailingCamera {
        inner,
        remaining: u32::MAX,
        failed_opens: 1,
    };
    let controller = MotionCaptureController::new(driver, config);

    let result = controller.initialize();
    assert!(matches!(
        result,
        Err(Error::Hardware(HardwareError::Camera(_)))
    ));
    assert!(!controller.is_initialized());

    // Whatever came up before the failure is released again
    let snapshot = probe.snapshot();
    assert!(!snapshot.initialized);
    assert!(!snapshot.motor_energized);
    assert!(!snapshot.led);

    let status = controller.get_status();
    assert!(!status.initialized);
    assert!(status.error.unwrap().contains("no camera detected"));
    assert!(matches!(
        controller.advance_frames(1).await,
        Err(Error::NotInitialized)
    ));
    controller.cleanup().await.unwrap();

    // The next attempt comes up normally
    controller.initialize().unwrap();
    assert!(controller.is_initialized());
    assert!(probe.snapshot().initialized);
    assert_eq!(controller.advance_frames(2).await.unwrap(), 2);
    controller.cleanup().await.unwrap();
    assert!(!probe.snapshot().initialized);
}

#[tokio::test(start_paused = true)]
async fn cleanup_stops_running_capture() {
    let (controller, probe) = simulated();
    let dir = tempfile::tempdir().unwrap();

    let task = controller.start_capture(30, dir.path()).await.unwrap().unwrap();
    controller.cleanup().await.unwrap();

    assert!(task.is_finished());
    assert!(matches!(task.wait().await, CaptureOutcome::Cancelled { .. }));
    let snapshot = probe.snapshot();
    assert!(!snapshot.motor_energized);
    assert!(!snapshot.initialized);
    assert!(!controller.get_status().initialized);
}

// =============================================================================
// Status
// =============================================================================

#[test]
fn status_serializes_with_client_keys() {
    let (controller, _probe) = simulated();
    let json = serde_json::to_value(controller.get_status()).unwrap();

    for key in [
        "led",
        "zoom_level",
        "pan_x",
        "pan_y",
        "frame_position",
        "capture_active",
        "capture_target",
        "capture_count",
        "stop_requested",
        "capture_state",
        "operation",
        "motor_energized",
        "mock_mode",
        "initialized",
        "error",
    ] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(json["capture_state"], "idle");
    assert_eq!(json["mock_mode"], true);
    assert!(json["error"].is_null());
}
