//! Degraded-mode detections.
//!
//! When no vision engine is available the recognizer still reports a
//! plausible detection for every frame so downstream display and tests can
//! exercise the full flow. Results are tagged `DetectionSource::Fallback`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::detection::{DetectionSource, PlateDetectionResult};
use crate::models::frame::{BoundingBox, FrameDimensions};

/// Plates used for synthetic output. Every entry matches `LLL DDD`.
pub const FALLBACK_PLATES: [&str; 10] = [
    "ABC123", "XYZ789", "DEF456", "GHI012", "JKL345", "MNO678", "PQR901", "STU234", "VWX567",
    "YZA890",
];

/// Seedable generator for synthetic detections.
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    rng: StdRng,
}

impl FallbackGenerator {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Produce one synthetic detection for a frame of the given size.
    pub fn generate(&mut self, frame: FrameDimensions) -> PlateDetectionResult {
        let plate = FALLBACK_PLATES[self.rng.gen_range(0..FALLBACK_PLATES.len())];
        let confidence = self.rng.gen_range(0.8..=1.0);
        let bounding_box = self.synthetic_box(frame);

        // Every pool entry is a valid plate, so construction cannot fail.
        match PlateDetectionResult::new(plate, confidence, bounding_box, DetectionSource::Fallback) {
            Some(result) => result,
            None => unreachable!("fallback pool entry {} is not a valid plate", plate),
        }
    }

    fn synthetic_box(&mut self, frame: FrameDimensions) -> BoundingBox {
        let width = self.rng.gen_range(150..250u32);
        let height = self.rng.gen_range(50..100u32);
        let x = self.rng.gen_range(50..150u32);
        let y = self.rng.gen_range(50..150u32);

        if frame.is_empty() {
            return BoundingBox::new(x, y, width, height);
        }

        let width = width.min(frame.width);
        let height = height.min(frame.height);
        BoundingBox::new(
            x.min(frame.width - width),
            y.min(frame.height - height),
            width,
            height,
        )
    }
}
