use plate_capture_core::{CaptureDelegate, CaptureError, CaptureState, PermissionState, PlateDetectionResult};

/// CaptureDelegate that prints detections as JSON lines and logs the rest.
pub struct JsonLinesDelegate;

impl CaptureDelegate for JsonLinesDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        log::debug!("Capture state: {:?}", state);
    }

    fn on_permission_changed(&self, permission: PermissionState) {
        log::info!("Camera permission: {:?}", permission);
    }

    fn on_error(&self, error: &CaptureError) {
        log::error!("Capture error: {}", error);
    }

    fn on_detection(&self, result: &PlateDetectionResult) {
        match serde_json::to_string(result) {
            Ok(line) => println!("{}", line),
            Err(e) => log::error!("Failed to serialize detection: {}", e),
        }
    }
}
