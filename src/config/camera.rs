//! Camera and framing configuration.

use serde::Deserialize;

use super::units::Resolution;

/// Camera configuration: output size, initial framing and nudge steps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Still output size.
    pub resolution: Resolution,

    /// Initial zoom (fraction of the sensor kept; smaller is more magnified).
    pub zoom: f64,

    /// Initial horizontal pan fraction.
    pub pan_h: f64,

    /// Initial vertical pan fraction.
    pub pan_v: f64,

    /// Zoom change per unit of `set_zoom` direction.
    pub zoom_step: f64,

    /// Pan change per unit of `set_pan` delta.
    pub pan_step: f64,

    /// File extension of captured frames.
    pub image_extension: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::PAL,
            zoom: 0.410,
            pan_h: 0.210,
            pan_v: 0.235,
            zoom_step: 0.01,
            pan_step: 0.01,
            image_extension: "jpg".into(),
        }
    }
}
