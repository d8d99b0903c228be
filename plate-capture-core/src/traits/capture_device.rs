use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use crate::models::config::CaptureConfiguration;
use crate::models::error::DeviceError;
use crate::models::frame::FrameDimensions;
use crate::models::state::PermissionState;

/// Interface for platform-specific camera access.
///
/// Implemented by:
/// - `StillImageDevice` (plate-capture-imaging)
/// - Future: V4L2 and browser `getUserMedia` bridges
pub trait CaptureDevice: Send {
    /// Whether this host exposes a camera API at all.
    fn is_supported(&self) -> bool;

    /// Request a video stream satisfying `config`.
    ///
    /// Acquires the physical device until the returned stream is stopped.
    fn open_stream(&mut self, config: &CaptureConfiguration) -> Result<Box<dyn VideoStream>, DeviceError>;

    /// Human-readable device label for logs.
    fn label(&self) -> String {
        "camera".into()
    }
}

/// A live stream bound to a presentable sink.
pub trait VideoStream: Send {
    /// Block until the sink reports its native dimensions, or `timeout` elapses.
    fn wait_ready(&mut self, timeout: Duration) -> Result<FrameDimensions, DeviceError>;

    /// Begin playback. Frames are presented only after this succeeds.
    fn play(&mut self) -> Result<(), DeviceError>;

    /// Copy of the frame currently presented. Must not wait for a new frame.
    fn copy_presented_frame(&self) -> Option<RgbaImage>;

    /// Stop every device track. Must be safe to call more than once.
    fn stop_tracks(&mut self);
}

/// Callback invoked whenever the platform camera permission changes.
pub type PermissionCallback = Arc<dyn Fn(PermissionState) + Send + Sync + 'static>;

/// Optional platform capability to query and observe camera permission.
pub trait PermissionMonitor: Send + Sync {
    /// Current permission, if the platform can answer.
    fn query(&self) -> Option<PermissionState>;

    /// Register for change notifications.
    fn subscribe(&self, callback: PermissionCallback);
}
