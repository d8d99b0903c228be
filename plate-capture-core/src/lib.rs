//! # plate-capture-core
//!
//! Platform-agnostic vehicle plate capture and recognition core.
//!
//! Provides the camera lifecycle (`FrameSource`), the plate recognizer with
//! its engine and fallback paths (`PlateRecognizer`), and a periodic
//! snapshot → detect driver (`ScanSession`). Platform backends implement
//! `CaptureDevice`; vision libraries implement `VisionEngine`.
//!
//! ## Architecture
//!
//! ```text
//! plate-capture-core (this crate)
//! ├── traits/       ← CaptureDevice, VideoStream, PermissionMonitor, VisionEngine, CaptureDelegate
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, FrameSnapshot, PlateDetectionResult, etc.
//! ├── capture/      ← FrameSource, ExecutionContext
//! ├── recognition/  ← PlateRecognizer, EngineHandle, format grammars, confidence, fallback
//! ├── processing/   ← DetectionHistory
//! └── session/      ← ScanSession (periodic driver)
//! ```

pub mod capture;
pub mod models;
pub mod processing;
pub mod recognition;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use capture::frame_source::{ExecutionContext, FrameSource};
pub use models::config::{CaptureConfiguration, FacingMode, RecognizerConfig};
pub use models::detection::{DetectionSource, PlateDetectionResult, RecognizerDiagnostics};
pub use models::error::{CaptureError, DeviceError, VisionError};
pub use models::frame::{BoundingBox, Contour, FrameDimensions, FrameSnapshot, Point};
pub use models::state::{CaptureState, EngineState, PermissionState, RecognizerState};
pub use processing::history::{DetectionHistory, DetectionMetrics, DetectionRecord};
pub use recognition::engine_handle::EngineHandle;
pub use recognition::fallback::FallbackGenerator;
pub use recognition::format::{is_valid_plate_format, PlateFormat};
pub use recognition::recognizer::PlateRecognizer;
pub use session::scan::{ScanSession, ScanStats};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_device::{CaptureDevice, PermissionCallback, PermissionMonitor, VideoStream};
pub use traits::vision_engine::VisionEngine;
