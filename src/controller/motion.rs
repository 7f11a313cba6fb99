//! Frame-counted film transport.

use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::hal::{Direction, HardwareDriver};

use super::{MotionCaptureController, Operation, Shared};

/// Exclusive hold on the motor for one operation.
///
/// Dropping the guard switches the motor off if it is still running, clears
/// the operation from state and then frees the slot.
pub(super) struct OperationGuard<D: HardwareDriver> {
    shared: Arc<Shared<D>>,
    operation: Operation,
    motor_running: bool,
    _permit: OwnedSemaphorePermit,
}

impl<D: HardwareDriver> OperationGuard<D> {
    /// Set the direction and start stepping at the configured duty.
    pub(super) fn start_motor(&mut self, direction: Direction) -> Result<()> {
        let duty = self.shared.config.motor.duty_percent;
        let mut driver = self.shared.driver();
        driver.set_direction(direction)?;
        // Enable may already be asserted if the PWM start fails.
        self.motor_running = true;
        driver.start_motor(duty)?;
        Ok(())
    }

    /// Switch the motor off, surfacing any failure to the caller.
    pub(super) fn stop_motor(&mut self) -> Result<()> {
        self.shared.driver().stop_motor()?;
        self.motor_running = false;
        Ok(())
    }
}

impl<D: HardwareDriver> Drop for OperationGuard<D> {
    fn drop(&mut self) {
        if self.motor_running {
            match self.shared.driver().stop_motor() {
                Ok(()) => debug!(operation = %self.operation, "motor stopped on unwind"),
                Err(e) => error!(operation = %self.operation, error = %e, "failed to stop motor"),
            }
        }

        let mut state = self.shared.state();
        if state.operation == Some(self.operation) {
            state.operation = None;
        }
    }
}

/// Result of waiting for the next frame edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EdgeWait {
    Frame,
    Cancelled,
    Stalled,
}

impl<D: HardwareDriver + 'static> MotionCaptureController<D> {
    /// Move `n` frames forward. Returns the frames moved.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] before [`initialize`](Self::initialize)
    /// - [`Error::Busy`] while another operation holds the motor
    /// - [`Error::StalledMotion`] if a stall timeout is configured and hit
    /// - [`Error::Hardware`] on a driver failure
    pub async fn advance_frames(&self, n: u32) -> Result<u32> {
        self.move_frames(Direction::Forward, n).await
    }

    /// Move `n` frames back. Returns the frames moved.
    ///
    /// Fails the same way as [`advance_frames`](Self::advance_frames).
    pub async fn rewind_frames(&self, n: u32) -> Result<u32> {
        self.move_frames(Direction::Reverse, n).await
    }

    async fn move_frames(&self, direction: Direction, n: u32) -> Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        self.ensure_initialized()?;

        let operation = match direction {
            Direction::Forward => Operation::Advance,
            Direction::Reverse => Operation::Rewind,
        };
        let mut guard = self.try_claim(operation).map_err(|holder| {
            warn!(requested = %operation, holder = %holder, "motor busy");
            Error::Busy(holder)
        })?;

        let result = self.drive(&mut guard, direction, n).await;
        drop(guard);

        match result {
            Ok(moved) => {
                info!(operation = %operation, frames = moved, "motion complete");
                Ok(moved)
            }
            Err(e) => {
                self.shared.record_error(&e);
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        guard: &mut OperationGuard<D>,
        direction: Direction,
        n: u32,
    ) -> Result<u32> {
        guard.start_motor(direction)?;

        let mut moved = 0;
        let mut last_edge = Instant::now();
        while moved < n {
            match self.await_edge(None, &mut last_edge).await? {
                EdgeWait::Frame => {
                    moved += 1;
                    let position = {
                        let mut state = self.shared.state();
                        state.frame_position += direction.sign();
                        state.frame_position
                    };
                    debug!(moved, position, "frame");
                }
                EdgeWait::Stalled => {
                    return Err(Error::StalledMotion { moved, requested: n });
                }
                EdgeWait::Cancelled => break,
            }
        }

        guard.stop_motor()?;
        Ok(moved)
    }

    /// Claim the motor for `operation`, or report which operation holds it.
    pub(super) fn try_claim(
        &self,
        operation: Operation,
    ) -> core::result::Result<OperationGuard<D>, Operation> {
        let permit = match Arc::clone(&self.shared.slot).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => return Err(self.shared.state().operation.unwrap_or(operation)),
        };
        self.shared.state().operation = Some(operation);

        Ok(OperationGuard {
            shared: Arc::clone(&self.shared),
            operation,
            motor_running: false,
            _permit: permit,
        })
    }

    /// Poll the rotation sensor once per tick until an edge arrives, the
    /// token is cancelled or the stall timeout runs out.
    pub(super) async fn await_edge(
        &self,
        cancel: Option<&CancellationToken>,
        last_edge: &mut Instant,
    ) -> Result<EdgeWait> {
        let timing = &self.shared.config.timing;
        let tick = timing.poll_interval();
        let stall = timing.stall_timeout();

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Ok(EdgeWait::Cancelled);
            }

            let edge = self.shared.driver().poll_frame_edge()?;
            if edge {
                *last_edge = Instant::now();
                return Ok(EdgeWait::Frame);
            }
            if stall.is_some_and(|limit| last_edge.elapsed() >= limit) {
                return Ok(EdgeWait::Stalled);
            }

            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return Ok(EdgeWait::Cancelled),
                        _ = sleep(tick) => {}
                    }
                }
                None => sleep(tick).await,
            }
        }
    }
}
