use chrono::{DateTime, Utc};
use serde::Serialize;

use super::frame::BoundingBox;
use crate::recognition::format::{self, PlateFormat};

/// Where a detection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    /// Image analysis by the vision engine.
    Engine,
    /// Synthetic output produced while the vision engine is unavailable.
    Fallback,
}

/// One recognized plate.
///
/// Construction validates the text, so `plate_text` is always non-empty,
/// normalized, and matches at least one plate grammar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateDetectionResult {
    plate_text: String,
    format: PlateFormat,
    confidence: f64,
    bounding_box: BoundingBox,
    source: DetectionSource,
    processing_time_ms: f64,
    detected_at: DateTime<Utc>,
}

impl PlateDetectionResult {
    /// Returns None when `plate_text` is not a valid plate.
    ///
    /// Confidence is clamped to `[0, 1]`.
    pub fn new(
        plate_text: &str,
        confidence: f64,
        bounding_box: BoundingBox,
        source: DetectionSource,
    ) -> Option<Self> {
        let normalized = format::normalize_plate_text(plate_text);
        let format = format::match_plate_format(&normalized)?;
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Some(Self {
            plate_text: normalized,
            format,
            confidence,
            bounding_box,
            source,
            processing_time_ms: 0.0,
            detected_at: Utc::now(),
        })
    }

    pub(crate) fn with_processing_time(mut self, elapsed: std::time::Duration) -> Self {
        self.processing_time_ms = elapsed.as_secs_f64() * 1000.0;
        self
    }

    pub fn plate_text(&self) -> &str {
        &self.plate_text
    }

    pub fn format(&self) -> PlateFormat {
        self.format
    }

    /// Heuristic prominence score in `[0, 1]`; not a probability.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn source(&self) -> DetectionSource {
        self.source
    }

    /// True when the vision engine was unavailable and this result is synthetic.
    pub fn is_fallback(&self) -> bool {
        self.source == DetectionSource::Fallback
    }

    pub fn processing_time_ms(&self) -> f64 {
        self.processing_time_ms
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }
}

/// Counters for debugging a long-running recognizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecognizerDiagnostics {
    pub frames_processed: u64,
    pub engine_detections: u64,
    pub fallback_detections: u64,
    pub frame_errors: u64,
    pub candidates_examined: u64,
    pub candidates_rejected_format: u64,
    pub scratch_buffers_allocated: u64,
}
