//! # plate-capture-imaging
//!
//! Pure-Rust backends for `plate-capture-core`.
//!
//! - `ImageprocEngine` implements `VisionEngine` with `image` + `imageproc`
//!   and delegates text reading to a `TextReader`.
//! - `CommandTextReader` pipes plate regions to an external OCR command
//!   (e.g. `tesseract stdin stdout --psm 7`).
//! - `StillImageDevice` implements `CaptureDevice` over image files, for
//!   demos and tests on hosts without a camera.

pub mod engine;
pub mod ocr;
pub mod still_device;

pub use engine::ImageprocEngine;
pub use ocr::{CommandTextReader, TextReader};
pub use still_device::StillImageDevice;
