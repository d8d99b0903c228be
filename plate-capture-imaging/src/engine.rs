use image::{imageops, GrayImage, Luma, RgbaImage};
use imageproc::contours::{self, BorderType};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology;

use plate_capture_core::{Contour, Point, VisionError, VisionEngine};

use crate::ocr::TextReader;

/// Sigma matching a 5×5 Gaussian kernel.
const BLUR_SIGMA: f32 = 1.1;
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;
/// Chebyshev radius 1 is a 3×3 square structuring element.
const CLOSE_RADIUS: u8 = 1;

/// `VisionEngine` built on `imageproc`, with text reading delegated to `R`.
///
/// Stateless apart from the reader, so safe to use from several threads.
pub struct ImageprocEngine<R: TextReader> {
    reader: R,
}

impl<R: TextReader> ImageprocEngine<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }
}

fn require_pixels(image: &GrayImage, stage: &str) -> Result<(), VisionError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(VisionError::InvalidFrame(format!("{} on empty image", stage)));
    }
    Ok(())
}

impl<R: TextReader> VisionEngine for ImageprocEngine<R> {
    fn name(&self) -> &str {
        "imageproc"
    }

    fn to_grayscale(&self, frame: &RgbaImage) -> Result<GrayImage, VisionError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(VisionError::InvalidFrame("empty RGBA frame".into()));
        }
        Ok(imageops::grayscale(frame))
    }

    fn blur(&self, gray: &GrayImage) -> Result<GrayImage, VisionError> {
        require_pixels(gray, "blur")?;
        Ok(gaussian_blur_f32(gray, BLUR_SIGMA))
    }

    fn detect_edges(&self, gray: &GrayImage) -> Result<GrayImage, VisionError> {
        require_pixels(gray, "edge detection")?;
        Ok(canny(gray, CANNY_LOW, CANNY_HIGH))
    }

    fn find_contours(&self, edges: &GrayImage) -> Result<Vec<Contour>, VisionError> {
        require_pixels(edges, "contour search")?;
        let found = contours::find_contours::<i32>(edges)
            .into_iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
            .map(|c| Contour::new(c.points.into_iter().map(|p| Point::new(p.x, p.y)).collect()))
            .collect();
        Ok(found)
    }

    fn binarize(&self, gray: &GrayImage) -> Result<GrayImage, VisionError> {
        require_pixels(gray, "binarization")?;
        let level = otsu_level(gray);
        let mut binary = gray.clone();
        for pixel in binary.pixels_mut() {
            *pixel = Luma([if pixel[0] > level { 255 } else { 0 }]);
        }
        Ok(binary)
    }

    fn close(&self, binary: &GrayImage) -> Result<GrayImage, VisionError> {
        require_pixels(binary, "closing")?;
        Ok(morphology::close(binary, Norm::LInf, CLOSE_RADIUS))
    }

    fn extract_text(&self, region: &GrayImage) -> Result<Option<String>, VisionError> {
        require_pixels(region, "text extraction")?;
        self.reader.read_text(region)
    }

    fn supports_concurrent_use(&self) -> bool {
        true
    }
}
