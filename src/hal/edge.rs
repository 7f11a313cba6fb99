//! Falling-edge detection on the rotation sensor.

use core::time::Duration;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::digital::InputPin;
use tokio::time::Instant;

use crate::error::HardwareError;

/// Source of debounced falling edges, one per film frame.
pub trait EdgeSource: Send {
    /// Start detecting edges, ignoring any closer together than `debounce`.
    fn arm(&mut self, debounce: Duration) -> Result<(), HardwareError>;

    /// Drop any armed detection. Idempotent.
    fn clear(&mut self);

    /// Report whether a new falling edge occurred since the last poll.
    fn poll(&mut self) -> Result<bool, HardwareError>;
}

/// Software edge detector that samples an input pin on every poll.
///
/// A high-to-low transition counts as an edge unless it falls inside the
/// debounce window of the previous accepted edge.
///
/// The sensor must stay low for at least one poll interval
/// (`timing.poll_interval_ms`) or the edge is missed. For shorter pulses feed
/// a [`LatchedEdge`] from the platform's edge interrupt instead.
pub struct SampledEdge<P: InputPin> {
    pin: P,
    armed: bool,
    last_high: bool,
    debounce: Duration,
    last_edge: Option<Instant>,
}

impl<P: InputPin> SampledEdge<P> {
    /// Wrap an input pin. Detection starts on [`EdgeSource::arm`].
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            armed: false,
            last_high: true,
            debounce: Duration::ZERO,
            last_edge: None,
        }
    }

    /// Whether detection is armed.
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Give the pin back.
    pub fn into_inner(self) -> P {
        self.pin
    }

    fn read(&mut self) -> Result<bool, HardwareError> {
        self.pin
            .is_high()
            .map_err(|_| HardwareError::Pin("frame_sensor"))
    }
}

impl<P: InputPin + Send> EdgeSource for SampledEdge<P> {
    fn arm(&mut self, debounce: Duration) -> Result<(), HardwareError> {
        // Seed with the current level so a sensor already low is not an edge
        self.last_high = self.read().map_err(|e| {
            HardwareError::EdgeDetection(format!("cannot sample sensor: {e}"))
        })?;
        self.debounce = debounce;
        self.last_edge = None;
        self.armed = true;
        Ok(())
    }

    fn clear(&mut self) {
        self.armed = false;
        self.last_edge = None;
    }

    fn poll(&mut self) -> Result<bool, HardwareError> {
        if !self.armed {
            return Err(HardwareError::EdgeDetection("detection not armed".into()));
        }

        let high = self.read()?;
        let falling = self.last_high && !high;
        self.last_high = high;

        if !falling {
            return Ok(false);
        }

        let now = Instant::now();
        if let Some(last) = self.last_edge {
            if now.duration_since(last) < self.debounce {
                return Ok(false);
            }
        }
        self.last_edge = Some(now);
        Ok(true)
    }
}

#[derive(Debug, Default)]
struct Latch {
    armed: bool,
    pending: bool,
    debounce: Duration,
    last_edge: Option<Instant>,
}

fn lock(latch: &Mutex<Latch>) -> MutexGuard<'_, Latch> {
    latch.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Edge source fed by an interrupt handler.
///
/// The platform registers a falling-edge callback on the sensor pin and calls
/// [`EdgeLatch::falling_edge`] from it. The edge is held until the next poll,
/// so no minimum pulse width applies. Debounce is applied when the edge is
/// recorded.
#[derive(Debug, Default)]
pub struct LatchedEdge {
    latch: Arc<Mutex<Latch>>,
}

/// Handle for recording edges into a [`LatchedEdge`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EdgeLatch {
    latch: Arc<Mutex<Latch>>,
}

impl LatchedEdge {
    /// Create the source and the handle for the interrupt callback.
    pub fn new() -> (Self, EdgeLatch) {
        let source = Self::default();
        let handle = EdgeLatch {
            latch: Arc::clone(&source.latch),
        };
        (source, handle)
    }

    /// Whether detection is armed.
    pub fn is_armed(&self) -> bool {
        lock(&self.latch).armed
    }
}

impl EdgeLatch {
    /// Record a falling edge. Ignored while disarmed or inside the debounce
    /// window of the previous edge.
    pub fn falling_edge(&self) {
        let mut latch = lock(&self.latch);
        if !latch.armed {
            return;
        }

        let now = Instant::now();
        if let Some(last) = latch.last_edge {
            if now.duration_since(last) < latch.debounce {
                return;
            }
        }
        latch.last_edge = Some(now);
        latch.pending = true;
    }
}

impl EdgeSource for LatchedEdge {
    fn arm(&mut self, debounce: Duration) -> Result<(), HardwareError> {
        let mut latch = lock(&self.latch);
        latch.debounce = debounce;
        latch.last_edge = None;
        latch.pending = false;
        latch.armed = true;
        Ok(())
    }

    fn clear(&mut self) {
        let mut latch = lock(&self.latch);
        latch.armed = false;
        latch.pending = false;
        latch.last_edge = None;
    }

    fn poll(&mut self) -> Result<bool, HardwareError> {
        let mut latch = lock(&self.latch);
        if !latch.armed {
            return Err(HardwareError::EdgeDetection("detection not armed".into()));
        }
        Ok(core::mem::take(&mut latch.pending))
    }
}
