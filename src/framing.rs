//! Zoom/pan framing and camera crop geometry.
//!
//! Zoom is the fraction of the sensor kept in each dimension, so a smaller
//! value is a tighter (more magnified) view. Pan places the crop window inside
//! the margin left over by the zoom, which keeps it on the sensor by
//! construction.

use serde::Serialize;

use crate::config::CameraConfig;

/// Most magnified zoom.
pub const ZOOM_MIN: f64 = 0.1;
/// Full sensor.
pub const ZOOM_MAX: f64 = 1.0;
/// Left/top edge.
pub const PAN_MIN: f64 = 0.0;
/// Right/bottom edge.
pub const PAN_MAX: f64 = 1.0;

/// Full pixel array of the camera sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SensorSize {
    /// Create a new sensor size.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Sub-rectangle of the sensor selected for output (ScalerCrop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CropRegion {
    /// Left edge in sensor pixels.
    pub x: u32,
    /// Top edge in sensor pixels.
    pub y: u32,
    /// Width in sensor pixels.
    pub width: u32,
    /// Height in sensor pixels.
    pub height: u32,
}

impl CropRegion {
    /// Check that the region lies entirely on the sensor.
    pub fn fits(&self, sensor: SensorSize) -> bool {
        self.x as u64 + self.width as u64 <= sensor.width as u64
            && self.y as u64 + self.height as u64 <= sensor.height as u64
    }
}

/// Normalized framing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    zoom: f64,
    pan_h: f64,
    pan_v: f64,
    zoom_step: f64,
    pan_step: f64,
}

impl Framing {
    /// Create framing from initial values and nudge steps, clamping the values.
    pub fn new(zoom: f64, pan_h: f64, pan_v: f64, zoom_step: f64, pan_step: f64) -> Self {
        Self {
            zoom: clamp_zoom(zoom),
            pan_h: clamp_pan(pan_h),
            pan_v: clamp_pan(pan_v),
            zoom_step,
            pan_step,
        }
    }

    /// Create framing from the camera section of the configuration.
    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            config.zoom,
            config.pan_h,
            config.pan_v,
            config.zoom_step,
            config.pan_step,
        )
    }

    /// Current zoom.
    #[inline]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Current `(pan_h, pan_v)`.
    #[inline]
    pub fn pan(&self) -> (f64, f64) {
        (self.pan_h, self.pan_v)
    }

    /// Nudge zoom; `direction = +1` zooms in (decreases the kept fraction).
    pub fn nudge_zoom(&mut self, direction: i32) -> f64 {
        self.zoom = clamp_zoom(self.zoom - f64::from(direction) * self.zoom_step);
        self.zoom
    }

    /// Nudge pan by whole steps in each axis.
    pub fn nudge_pan(&mut self, dx: i32, dy: i32) -> (f64, f64) {
        self.pan_h = clamp_pan(self.pan_h + f64::from(dx) * self.pan_step);
        self.pan_v = clamp_pan(self.pan_v + f64::from(dy) * self.pan_step);
        self.pan()
    }

    /// Crop region for this framing on the given sensor.
    pub fn crop(&self, sensor: SensorSize) -> CropRegion {
        let width = scale(sensor.width, self.zoom);
        let height = scale(sensor.height, self.zoom);

        CropRegion {
            x: scale(sensor.width - width, self.pan_h),
            y: scale(sensor.height - height, self.pan_v),
            width,
            height,
        }
    }
}

impl Default for Framing {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

fn clamp_zoom(value: f64) -> f64 {
    if value.is_nan() {
        return ZOOM_MAX;
    }
    value.clamp(ZOOM_MIN, ZOOM_MAX)
}

fn clamp_pan(value: f64) -> f64 {
    if value.is_nan() {
        return PAN_MIN;
    }
    value.clamp(PAN_MIN, PAN_MAX)
}

// Truncates toward zero; `fraction` is already clamped to [0, 1].
fn scale(extent: u32, fraction: f64) -> u32 {
    ((extent as f64 * fraction) as u32).min(extent)
}
