//! Camera acquisition boundary. A device is held only while the capture view
//! is open and is released on every exit path.

use crate::canvas::error::ResourceError;
use image::RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    #[default]
    Environment,
    User,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Environment => Self::User,
            Self::User => Self::Environment,
        }
    }
}

pub trait CameraDevice {
    fn capture_frame(&mut self) -> Result<RgbaImage, ResourceError>;
    fn release(&mut self);
}

pub trait CameraProvider {
    fn acquire(&mut self, facing: FacingMode) -> Result<Box<dyn CameraDevice>, ResourceError>;
}

/// Provider for hosts without camera support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCamera;

impl CameraProvider for NoCamera {
    fn acquire(&mut self, _facing: FacingMode) -> Result<Box<dyn CameraDevice>, ResourceError> {
        Err(ResourceError::CameraUnavailable(
            "no camera backend on this host".into(),
        ))
    }
}

struct DeviceGuard(Box<dyn CameraDevice>);

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[derive(Default)]
pub struct CameraSession {
    device: Option<DeviceGuard>,
    facing: FacingMode,
    open: bool,
    error: Option<String>,
}

impl CameraSession {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_streaming(&self) -> bool {
        self.device.is_some()
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    /// Last acquisition or capture error, shown inline in the capture view.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn open(&mut self, provider: &mut dyn CameraProvider) -> Result<(), ResourceError> {
        self.open = true;
        self.start(provider)
    }

    /// Release the current device, flip the facing mode and acquire again.
    pub fn switch_facing(&mut self, provider: &mut dyn CameraProvider) -> Result<(), ResourceError> {
        self.stop();
        self.facing = self.facing.toggled();
        if self.open {
            self.start(provider)
        } else {
            Ok(())
        }
    }

    /// Grab one frame and close. The device is released whether or not the
    /// capture succeeds.
    pub fn capture(&mut self) -> Result<RgbaImage, ResourceError> {
        let result = match self.device.as_mut() {
            Some(guard) => guard.0.capture_frame(),
            None => Err(ResourceError::CameraUnavailable("camera is not streaming".into())),
        };
        if let Err(err) = &result {
            self.error = Some(err.to_string());
        }
        self.close();
        result
    }

    pub fn close(&mut self) {
        self.stop();
        self.open = false;
    }

    fn start(&mut self, provider: &mut dyn CameraProvider) -> Result<(), ResourceError> {
        self.stop();
        self.error = None;
        match provider.acquire(self.facing) {
            Ok(device) => {
                tracing::debug!(facing = ?self.facing, "camera acquired");
                self.device = Some(DeviceGuard(device));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "camera acquisition failed");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn stop(&mut self) {
        if self.device.take().is_some() {
            tracing::debug!("camera released");
        }
    }
}
