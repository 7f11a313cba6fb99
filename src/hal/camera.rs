//! Camera device interface.

use std::fs;
use std::path::Path;

use crate::config::Resolution;
use crate::error::HardwareError;
use crate::framing::{CropRegion, SensorSize};

/// Still camera used for preview and frame capture.
///
/// Implemented by the platform camera binding; the core only sequences calls.
pub trait Camera: Send {
    /// Select the still output size.
    fn configure(&mut self, resolution: Resolution) -> Result<(), HardwareError>;

    /// Start streaming.
    fn start(&mut self) -> Result<(), HardwareError>;

    /// Stop streaming.
    fn stop(&mut self) -> Result<(), HardwareError>;

    /// Release the device.
    fn close(&mut self) -> Result<(), HardwareError>;

    /// Full pixel array size.
    fn sensor_size(&self) -> Result<SensorSize, HardwareError>;

    /// Apply a crop region (ScalerCrop).
    fn set_crop(&mut self, crop: CropRegion) -> Result<(), HardwareError>;

    /// Capture a still to a file.
    fn capture_file(&mut self, path: &Path) -> Result<(), HardwareError>;

    /// Capture a JPEG-encoded still into memory.
    fn capture_jpeg(&mut self) -> Result<Vec<u8>, HardwareError>;
}

/// Camera stand-in that produces empty images.
///
/// Captured files exist but are empty and previews are empty buffers, so the
/// capture sequence and its file naming can run without a sensor.
#[derive(Debug, Clone)]
pub struct PlaceholderCamera {
    sensor: SensorSize,
    resolution: Option<Resolution>,
    crop: Option<CropRegion>,
    running: bool,
}

impl PlaceholderCamera {
    /// Create a placeholder reporting the given sensor size.
    pub fn new(sensor: SensorSize) -> Self {
        Self {
            sensor,
            resolution: None,
            crop: None,
            running: false,
        }
    }

    /// Last crop region applied.
    pub fn crop(&self) -> Option<CropRegion> {
        self.crop
    }

    /// Whether the camera is streaming.
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Camera for PlaceholderCamera {
    fn configure(&mut self, resolution: Resolution) -> Result<(), HardwareError> {
        self.resolution = Some(resolution);
        Ok(())
    }

    fn start(&mut self) -> Result<(), HardwareError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareError> {
        self.running = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        self.running = false;
        self.resolution = None;
        Ok(())
    }

    fn sensor_size(&self) -> Result<SensorSize, HardwareError> {
        Ok(self.sensor)
    }

    fn set_crop(&mut self, crop: CropRegion) -> Result<(), HardwareError> {
        self.crop = Some(crop);
        Ok(())
    }

    fn capture_file(&mut self, path: &Path) -> Result<(), HardwareError> {
        fs::write(path, b"").map_err(|e| HardwareError::Io(format!("{}: {e}", path.display())))
    }

    fn capture_jpeg(&mut self) -> Result<Vec<u8>, HardwareError> {
        Ok(Vec::new())
    }
}
