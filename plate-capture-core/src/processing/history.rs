use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::detection::{DetectionSource, PlateDetectionResult};

/// One entry in the detection history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub plate_text: String,
    pub confidence: f64,
    pub source: DetectionSource,
    pub processing_time_ms: f64,
    pub detected_at: DateTime<Utc>,
}

impl From<&PlateDetectionResult> for DetectionRecord {
    fn from(result: &PlateDetectionResult) -> Self {
        Self {
            plate_text: result.plate_text().to_string(),
            confidence: result.confidence(),
            source: result.source(),
            processing_time_ms: result.processing_time_ms(),
            detected_at: result.detected_at(),
        }
    }
}

/// Aggregates over the frames seen and the detections retained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DetectionMetrics {
    pub total_frames: u64,
    pub successful_detections: u64,
    /// Percentage of frames that produced a detection (0–100).
    pub success_rate: f64,
    /// Mean confidence over the retained history.
    pub average_confidence: f64,
    /// Mean processing time over the retained history.
    pub average_processing_time_ms: f64,
}

/// Bounded circular history of recent detections.
///
/// Overflow behavior: overwrites the oldest record. Frame counters keep
/// counting past capacity.
#[derive(Debug)]
pub struct DetectionHistory {
    records: Vec<DetectionRecord>,
    write_index: usize,
    capacity: usize,
    total_frames: u64,
    successful_detections: u64,
}

impl DetectionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            write_index: 0,
            capacity,
            total_frames: 0,
            successful_detections: 0,
        }
    }

    /// Account for one processed frame and its outcome.
    pub fn record_frame(&mut self, outcome: Option<&PlateDetectionResult>) {
        self.total_frames += 1;
        let Some(result) = outcome else {
            return;
        };
        self.successful_detections += 1;

        let record = DetectionRecord::from(result);
        if self.records.len() < self.capacity {
            self.records.push(record);
        } else {
            self.records[self.write_index] = record;
        }
        self.write_index = (self.write_index + 1) % self.capacity;
    }

    /// Retained records, oldest first.
    pub fn recent(&self) -> Vec<DetectionRecord> {
        if self.records.len() < self.capacity {
            return self.records.clone();
        }
        let mut ordered = Vec::with_capacity(self.capacity);
        for i in 0..self.capacity {
            ordered.push(self.records[(self.write_index + i) % self.capacity].clone());
        }
        ordered
    }

    pub fn latest(&self) -> Option<&DetectionRecord> {
        if self.records.is_empty() {
            return None;
        }
        let index = (self.write_index + self.capacity - 1) % self.capacity;
        self.records.get(index)
    }

    pub fn metrics(&self) -> DetectionMetrics {
        let count = self.records.len();
        let (average_confidence, average_processing_time_ms) = if count == 0 {
            (0.0, 0.0)
        } else {
            let confidence: f64 = self.records.iter().map(|r| r.confidence).sum();
            let time: f64 = self.records.iter().map(|r| r.processing_time_ms).sum();
            (confidence / count as f64, time / count as f64)
        };
        let success_rate = if self.total_frames == 0 {
            0.0
        } else {
            self.successful_detections as f64 / self.total_frames as f64 * 100.0
        };

        DetectionMetrics {
            total_frames: self.total_frames,
            successful_detections: self.successful_detections,
            success_rate,
            average_confidence,
            average_processing_time_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget all records and counters.
    pub fn reset(&mut self) {
        self.records.clear();
        self.write_index = 0;
        self.total_frames = 0;
        self.successful_detections = 0;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::models::frame::BoundingBox;

    fn detection(text: &str, confidence: f64) -> PlateDetectionResult {
        PlateDetectionResult::new(text, confidence, BoundingBox::new(0, 0, 150, 50), DetectionSource::Engine)
            .unwrap()
    }

    #[test]
    fn records_in_order() {
        let mut history = DetectionHistory::new(3);
        history.record_frame(Some(&detection("ABC123", 0.9)));
        history.record_frame(Some(&detection("XYZ789", 0.8)));

        let plates: Vec<_> = history.recent().into_iter().map(|r| r.plate_text).collect();
        assert_eq!(plates, vec!["ABC123", "XYZ789"]);
        assert_eq!(history.latest().unwrap().plate_text, "XYZ789");
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut history = DetectionHistory::new(2);
        history.record_frame(Some(&detection("ABC123", 0.9)));
        history.record_frame(Some(&detection("DEF456", 0.9)));
        history.record_frame(Some(&detection("GHI012", 0.9)));

        let plates: Vec<_> = history.recent().into_iter().map(|r| r.plate_text).collect();
        assert_eq!(plates, vec!["DEF456", "GHI012"]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().plate_text, "GHI012");
    }

    #[test]
    fn metrics_count_misses() {
        let mut history = DetectionHistory::new(10);
        history.record_frame(Some(&detection("ABC123", 0.9)));
        history.record_frame(None);
        history.record_frame(Some(&detection("XYZ789", 0.8)));
        history.record_frame(None);

        let metrics = history.metrics();
        assert_eq!(metrics.total_frames, 4);
        assert_eq!(metrics.successful_detections, 2);
        assert_relative_eq!(metrics.success_rate, 50.0);
        assert_relative_eq!(metrics.average_confidence, 0.85, epsilon = 1e-9);
    }

    #[test]
    fn reset_clears_history() {
        let mut history = DetectionHistory::new(4);
        history.record_frame(Some(&detection("ABC123", 0.9)));
        history.reset();

        assert!(history.is_empty());
        assert!(history.latest().is_none());
        assert_eq!(history.metrics(), DetectionMetrics::default());
    }

    #[test]
    fn empty_history() {
        let history = DetectionHistory::new(0);
        assert_eq!(history.capacity(), 1);
        assert!(history.recent().is_empty());
        assert_eq!(history.metrics().success_rate, 0.0);
    }
}
