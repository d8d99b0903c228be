use image::{imageops, GrayImage, RgbaImage};

use crate::models::error::VisionError;
use crate::models::frame::{BoundingBox, Contour};

/// Image-analysis primitives the recognizer needs from a vision library.
///
/// Implemented by:
/// - `ImageprocEngine` (plate-capture-imaging)
///
/// Every method returns a fresh owned buffer; the recognizer scopes each one
/// to a single `detect` call.
pub trait VisionEngine: Send + Sync {
    /// Engine identifier for logs.
    fn name(&self) -> &str;

    /// RGBA → single-channel luminance.
    fn to_grayscale(&self, frame: &RgbaImage) -> Result<GrayImage, VisionError>;

    /// Noise-reducing blur (5×5 Gaussian or equivalent).
    fn blur(&self, gray: &GrayImage) -> Result<GrayImage, VisionError>;

    /// Edge map, edges non-zero.
    fn detect_edges(&self, gray: &GrayImage) -> Result<GrayImage, VisionError>;

    /// Outermost closed contours of an edge map, in scan order.
    fn find_contours(&self, edges: &GrayImage) -> Result<Vec<Contour>, VisionError>;

    /// Enclosed contour area in px².
    fn contour_area(&self, contour: &Contour) -> f64 {
        contour.area()
    }

    /// Upright bounding rectangle.
    fn bounding_rect(&self, contour: &Contour) -> BoundingBox {
        contour.bounding_box()
    }

    /// Copy out the pixels under `rect`.
    fn extract_region(&self, gray: &GrayImage, rect: BoundingBox) -> Result<GrayImage, VisionError> {
        let (width, height) = gray.dimensions();
        if rect.width == 0
            || rect.height == 0
            || rect.x as u64 + rect.width as u64 > width as u64
            || rect.y as u64 + rect.height as u64 > height as u64
        {
            return Err(VisionError::InvalidFrame(format!(
                "region {:?} outside {}x{} frame",
                rect, width, height
            )));
        }
        Ok(imageops::crop_imm(gray, rect.x, rect.y, rect.width, rect.height).to_image())
    }

    /// Global binarization with the threshold that maximizes between-class variance.
    fn binarize(&self, gray: &GrayImage) -> Result<GrayImage, VisionError>;

    /// Morphological closing to consolidate character strokes.
    fn close(&self, binary: &GrayImage) -> Result<GrayImage, VisionError>;

    /// Read text from a cleaned plate region. Ok(None) when nothing legible.
    fn extract_text(&self, region: &GrayImage) -> Result<Option<String>, VisionError>;

    /// Whether `detect` calls may use this engine from several threads at once.
    fn supports_concurrent_use(&self) -> bool {
        false
    }
}
