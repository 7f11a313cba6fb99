//! Capture runs: one still per detected frame, numbered from `0001`.

use std::fs;
use std::path::{Path, PathBuf};

use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, Error, Result};
use crate::hal::{Direction, HardwareDriver};

use super::motion::{EdgeWait, OperationGuard};
use super::{CaptureState, MotionCaptureController, Operation};

/// How a capture run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// All requested frames were captured.
    Completed {
        /// Frames captured.
        frames: u32,
    },
    /// Stopped by [`MotionCaptureController::stop_capture`].
    Cancelled {
        /// Frames captured before the stop.
        frames: u32,
    },
    /// Aborted by an error, which is also recorded in the status.
    Failed {
        /// Frames captured before the failure.
        frames: u32,
        /// What went wrong.
        error: Error,
    },
}

impl CaptureOutcome {
    /// Frames captured by the run.
    pub fn frames(&self) -> u32 {
        match self {
            CaptureOutcome::Completed { frames }
            | CaptureOutcome::Cancelled { frames }
            | CaptureOutcome::Failed { frames, .. } => *frames,
        }
    }

    /// Terminal state matching this outcome.
    pub fn state(&self) -> CaptureState {
        match self {
            CaptureOutcome::Completed { .. } => CaptureState::Completed,
            CaptureOutcome::Cancelled { .. } => CaptureState::Cancelled,
            CaptureOutcome::Failed { .. } => CaptureState::Failed,
        }
    }
}

/// Handle to a capture run running in the background.
///
/// Dropping the handle does not stop the run; use
/// [`MotionCaptureController::stop_capture`].
#[derive(Debug)]
pub struct CaptureTask {
    handle: JoinHandle<CaptureOutcome>,
}

impl CaptureTask {
    /// Whether the run has ended and released the motor.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end. Once this returns the motor is off.
    pub async fn wait(self) -> CaptureOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => CaptureOutcome::Failed {
                frames: 0,
                error: Error::Capture(CaptureError::Aborted(e.to_string())),
            },
        }
    }
}

struct PreparedRun<D: HardwareDriver> {
    guard: OperationGuard<D>,
    cancel: CancellationToken,
    target: u32,
    dir: PathBuf,
}

impl<D: HardwareDriver + 'static> MotionCaptureController<D> {
    /// Start a capture run of `n_frames` into `output_dir` in the background.
    ///
    /// The output directory is created and the LED switched on before this
    /// returns, so those failures surface here. Returns `Ok(None)` without
    /// touching any state if a run (or any other motor operation) is already
    /// in progress.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::InvalidFrameCount`] for `n_frames == 0`
    /// - [`Error::NotInitialized`] before [`initialize`](Self::initialize)
    /// - [`CaptureError::DirectoryCreation`] if the directory cannot be made
    /// - [`Error::Hardware`] if the LED cannot be switched on
    pub async fn start_capture<P: AsRef<Path>>(
        &self,
        n_frames: u32,
        output_dir: P,
    ) -> Result<Option<CaptureTask>> {
        let Some(run) = self.prepare_capture(n_frames, output_dir.as_ref())? else {
            return Ok(None);
        };

        let this = self.clone();
        let handle = tokio::spawn(async move { this.execute_capture(run).await });

        sleep(self.shared.config.timing.start_grace_ms.as_duration()).await;
        Ok(Some(CaptureTask { handle }))
    }

    /// Run a capture to the end on the current task.
    ///
    /// Fails with [`Error::Busy`] instead of doing nothing when the motor is
    /// held; otherwise the same as [`start_capture`](Self::start_capture).
    pub async fn run_capture<P: AsRef<Path>>(
        &self,
        n_frames: u32,
        output_dir: P,
    ) -> Result<CaptureOutcome> {
        match self.prepare_capture(n_frames, output_dir.as_ref())? {
            Some(run) => Ok(self.execute_capture(run).await),
            None => {
                let holder = self.shared.state().operation.unwrap_or(Operation::Capture);
                Err(Error::Busy(holder))
            }
        }
    }

    /// Request the running capture to stop.
    ///
    /// `capture_active` drops immediately; the motor is only guaranteed off
    /// once the run itself has ended. Returns whether a run was signalled.
    pub fn stop_capture(&self) -> bool {
        let mut state = self.shared.state();
        state.stop_requested = true;
        state.capture_active = false;

        match state.cancel.take() {
            Some(token) => {
                token.cancel();
                info!(captured = state.capture_count, "capture stop requested");
                true
            }
            None => {
                debug!("stop requested with no capture running");
                false
            }
        }
    }

    fn prepare_capture(&self, n_frames: u32, dir: &Path) -> Result<Option<PreparedRun<D>>> {
        if n_frames == 0 {
            return Err(CaptureError::InvalidFrameCount.into());
        }
        self.ensure_initialized()?;

        let guard = match self.try_claim(Operation::Capture) {
            Ok(guard) => guard,
            Err(holder) => {
                warn!(%holder, "capture start ignored: {holder} in progress");
                return Ok(None);
            }
        };

        // Installed with the reset so a stop during the entry phase is seen
        let cancel = CancellationToken::new();
        {
            let mut state = self.shared.state();
            state.capture_target = n_frames;
            state.capture_count = 0;
            state.stop_requested = false;
            state.last_error = None;
            state.capture_state = CaptureState::Running;
            state.cancel = Some(cancel.clone());
        }

        if let Err(e) = fs::create_dir_all(dir) {
            let err = Error::from(CaptureError::DirectoryCreation {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            });
            return Err(self.fail_start(err));
        }
        if let Err(e) = self.led_on() {
            return Err(self.fail_start(e));
        }

        self.shared.state().capture_active = !cancel.is_cancelled();
        info!(frames = n_frames, dir = %dir.display(), "capture started");

        Ok(Some(PreparedRun {
            guard,
            cancel,
            target: n_frames,
            dir: dir.to_path_buf(),
        }))
    }

    fn fail_start(&self, err: Error) -> Error {
        self.shared.record_error(&err);
        let mut state = self.shared.state();
        state.capture_state = CaptureState::Failed;
        state.capture_active = false;
        state.cancel = None;
        err
    }

    async fn execute_capture(&self, run: PreparedRun<D>) -> CaptureOutcome {
        let PreparedRun {
            mut guard,
            cancel,
            target,
            dir,
        } = run;

        let result = self.capture_frames(&mut guard, target, &dir, &cancel).await;
        // Motor off and slot freed before the run is reported finished.
        drop(guard);

        let frames = self.shared.state().capture_count;
        let outcome = match result {
            Ok(EdgeWait::Cancelled) => CaptureOutcome::Cancelled { frames },
            Ok(_) => CaptureOutcome::Completed { frames },
            Err(error) => {
                self.shared.record_error(&error);
                CaptureOutcome::Failed { frames, error }
            }
        };

        {
            let mut state = self.shared.state();
            state.capture_active = false;
            state.capture_state = outcome.state();
            state.cancel = None;
        }
        info!(frames, target, state = ?outcome.state(), "capture finished");
        outcome
    }

    /// Returns [`EdgeWait::Cancelled`] if stopped early, otherwise
    /// [`EdgeWait::Frame`].
    async fn capture_frames(
        &self,
        guard: &mut OperationGuard<D>,
        target: u32,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<EdgeWait> {
        // Stopped before the run got going
        if cancel.is_cancelled() {
            return Ok(EdgeWait::Cancelled);
        }

        let extension = &self.shared.config.camera.image_extension;
        guard.start_motor(Direction::Forward)?;

        let mut captured = 0;
        let mut last_edge = Instant::now();
        let mut end = EdgeWait::Frame;
        while captured < target {
            match self.await_edge(Some(cancel), &mut last_edge).await? {
                EdgeWait::Frame => {
                    let path = dir.join(format!("{:04}.{}", captured + 1, extension));
                    self.shared.driver().capture_to_file(&path)?;
                    captured += 1;

                    let mut state = self.shared.state();
                    state.capture_count = captured;
                    state.frame_position += 1;
                    debug!(frame = captured, target, path = %path.display(), "frame captured");
                }
                EdgeWait::Stalled => {
                    return Err(Error::StalledMotion {
                        moved: captured,
                        requested: target,
                    });
                }
                EdgeWait::Cancelled => {
                    end = EdgeWait::Cancelled;
                    break;
                }
            }
        }

        guard.stop_motor()?;
        Ok(end)
    }
}
