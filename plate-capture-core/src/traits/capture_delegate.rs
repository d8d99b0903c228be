use crate::models::detection::PlateDetectionResult;
use crate::models::error::CaptureError;
use crate::models::state::{CaptureState, PermissionState};

/// Event delegate for capture and recognition notifications.
///
/// Methods are called on the thread that caused the event: the caller of
/// `start`/`stop`, the platform permission thread, or the scan thread.
/// Implementations should marshal to a UI thread if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the frame source changes state.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called when the platform reports a camera permission change.
    fn on_permission_changed(&self, permission: PermissionState);

    /// Called when the capture lifecycle fails.
    fn on_error(&self, error: &CaptureError);

    /// Called for every plate detected by a scan session.
    fn on_detection(&self, result: &PlateDetectionResult);
}
