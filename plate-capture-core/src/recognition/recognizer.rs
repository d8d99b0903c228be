use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::models::config::RecognizerConfig;
use crate::models::detection::{DetectionSource, PlateDetectionResult, RecognizerDiagnostics};
use crate::models::error::VisionError;
use crate::models::frame::{BoundingBox, FrameSnapshot};
use crate::models::state::{EngineState, RecognizerState};
use crate::processing::history::{DetectionHistory, DetectionMetrics, DetectionRecord};
use crate::recognition::confidence::calculate_confidence;
use crate::recognition::engine_handle::EngineHandle;
use crate::recognition::fallback::FallbackGenerator;
use crate::recognition::format;
use crate::recognition::scratch::{ScratchBuffer, ScratchLedger};
use crate::traits::vision_engine::VisionEngine;

/// A plate-shaped region found while scanning one frame's contours.
#[derive(Debug)]
pub struct PlateCandidateRegion<'a> {
    pub bounding_box: BoundingBox,
    pub contour_area: f64,
    pub aspect_ratio: f64,
    pub pixels: ScratchBuffer<'a>,
}

/// Best format-valid candidate seen so far in a frame.
struct Winner {
    text: String,
    bounding_box: BoundingBox,
    contour_area: f64,
    aspect_ratio: f64,
}

/// Turns frame snapshots into plate detections.
///
/// With a ready vision engine each frame goes through the primary path:
/// ```text
/// RGBA → gray → blur → edges → contours
///   → area band → aspect band → crop → binarize → close → text
///   → grammar check → largest contour area wins
/// ```
/// Without one (initialization timed out) every frame yields a synthetic
/// detection tagged `DetectionSource::Fallback`.
///
/// Share across threads with `Arc<PlateRecognizer>`.
pub struct PlateRecognizer {
    engine: EngineHandle,
    config: RecognizerConfig,
    state: Mutex<RecognizerState>,
    state_changed: Condvar,
    fallback: Mutex<FallbackGenerator>,
    engine_gate: Mutex<()>,
    scratch: ScratchLedger,
    diagnostics: Mutex<RecognizerDiagnostics>,
    history: Mutex<DetectionHistory>,
}

impl PlateRecognizer {
    pub fn new(engine: EngineHandle, config: RecognizerConfig) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Configuration)?;
        Ok(Self {
            engine,
            fallback: Mutex::new(FallbackGenerator::new(config.fallback_seed)),
            history: Mutex::new(DetectionHistory::new(config.history_capacity)),
            config,
            state: Mutex::new(RecognizerState::Uninitialized),
            state_changed: Condvar::new(),
            engine_gate: Mutex::new(()),
            scratch: ScratchLedger::new(),
            diagnostics: Mutex::new(RecognizerDiagnostics::default()),
        })
    }

    pub fn state(&self) -> RecognizerState {
        *self.state.lock()
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Wait for the vision engine, at most `init_timeout`.
    ///
    /// Single-flight: the first caller performs the wait, concurrent callers
    /// block until it resolves and all observe the same terminal state.
    /// Never fails; a timeout resolves to `Unavailable`.
    pub fn initialize(&self) -> RecognizerState {
        let mut state = self.state.lock();
        loop {
            match *state {
                RecognizerState::Ready => return RecognizerState::Ready,
                RecognizerState::Unavailable => {
                    if self.engine.is_ready() {
                        log::info!("Vision engine became ready, leaving fallback mode");
                        *state = RecognizerState::Ready;
                    }
                    return *state;
                }
                RecognizerState::Initializing => self.state_changed.wait(&mut state),
                RecognizerState::Uninitialized => break,
            }
        }
        *state = RecognizerState::Initializing;
        drop(state);

        let timeout = self.config.init_timeout();
        let resolved = match self.engine.wait_ready(timeout) {
            EngineState::Ready => {
                log::info!("Plate recognizer initialized with vision engine");
                RecognizerState::Ready
            }
            EngineState::Loading => {
                log::warn!(
                    "Vision engine not ready after {}ms, using fallback detection",
                    timeout.as_millis()
                );
                RecognizerState::Unavailable
            }
            EngineState::Unavailable => {
                log::warn!("Vision engine unavailable, using fallback detection");
                RecognizerState::Unavailable
            }
        };

        *self.state.lock() = resolved;
        self.state_changed.notify_all();
        resolved
    }

    /// Recognize at most one plate in `frame`.
    ///
    /// Per-frame pipeline failures are logged and counted, never propagated:
    /// a bad frame just yields None.
    pub fn detect(&self, frame: FrameSnapshot) -> Option<PlateDetectionResult> {
        let started = Instant::now();

        let outcome = match self.initialize() {
            RecognizerState::Ready => self.detect_primary(&frame),
            _ => Some(self.detect_fallback(&frame)),
        }
        .map(|result| result.with_processing_time(started.elapsed()));

        self.diagnostics.lock().frames_processed += 1;
        self.history.lock().record_frame(outcome.as_ref());
        outcome
    }

    pub fn diagnostics(&self) -> RecognizerDiagnostics {
        let mut diagnostics = self.diagnostics.lock().clone();
        diagnostics.scratch_buffers_allocated = self.scratch.allocated();
        diagnostics
    }

    pub fn metrics(&self) -> DetectionMetrics {
        self.history.lock().metrics()
    }

    pub fn recent_detections(&self) -> Vec<DetectionRecord> {
        self.history.lock().recent()
    }

    /// Intermediate buffers currently held. Zero whenever no `detect` is running.
    pub fn live_scratch_buffers(&self) -> usize {
        self.scratch.live()
    }

    // --- Internal helpers ---

    fn detect_fallback(&self, frame: &FrameSnapshot) -> PlateDetectionResult {
        let result = self.fallback.lock().generate(frame.dimensions());
        self.diagnostics.lock().fallback_detections += 1;
        log::debug!(
            "Frame {}: engine unavailable, synthetic plate {}",
            frame.sequence(),
            result.plate_text()
        );
        result
    }

    fn detect_primary(&self, frame: &FrameSnapshot) -> Option<PlateDetectionResult> {
        let Some(engine) = self.engine.engine() else {
            return Some(self.detect_fallback(frame));
        };

        let _gate = (!engine.supports_concurrent_use()).then(|| self.engine_gate.lock());

        match self.run_pipeline(engine.as_ref(), frame) {
            Ok(Some(result)) => {
                self.diagnostics.lock().engine_detections += 1;
                Some(result)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Frame {} skipped: {}", frame.sequence(), e);
                self.diagnostics.lock().frame_errors += 1;
                None
            }
        }
    }

    fn run_pipeline(
        &self,
        engine: &dyn VisionEngine,
        frame: &FrameSnapshot,
    ) -> Result<Option<PlateDetectionResult>, VisionError> {
        if frame.dimensions().is_empty() {
            return Err(VisionError::InvalidFrame(format!(
                "empty frame {}x{}",
                frame.width(),
                frame.height()
            )));
        }

        let gray = self.scratch.track(engine.to_grayscale(frame.image())?);
        let contours = {
            let blurred = self.scratch.track(engine.blur(&gray)?);
            let edges = self.scratch.track(engine.detect_edges(&blurred)?);
            engine.find_contours(&edges)?
        };

        let mut winner: Option<Winner> = None;
        let (mut examined, mut rejected) = (0u64, 0u64);

        for contour in &contours {
            let area = engine.contour_area(contour);
            if !self.config.area_in_band(area) {
                continue;
            }
            let rect = engine.bounding_rect(contour);
            let aspect_ratio = rect.aspect_ratio();
            if !self.config.aspect_in_band(aspect_ratio) {
                continue;
            }
            // Equal area keeps the earlier candidate.
            if winner.as_ref().is_some_and(|w| area <= w.contour_area) {
                continue;
            }

            examined += 1;
            let candidate = match engine.extract_region(&gray, rect) {
                Ok(pixels) => PlateCandidateRegion {
                    bounding_box: rect,
                    contour_area: area,
                    aspect_ratio,
                    pixels: self.scratch.track(pixels),
                },
                Err(e) => {
                    log::debug!("Candidate {:?} dropped: {}", rect, e);
                    continue;
                }
            };

            match self.read_candidate(engine, &candidate) {
                Ok(Some(text)) => {
                    log::debug!("Candidate {:?} read as {}", rect, text);
                    winner = Some(Winner {
                        text,
                        bounding_box: candidate.bounding_box,
                        contour_area: candidate.contour_area,
                        aspect_ratio: candidate.aspect_ratio,
                    });
                }
                Ok(None) => rejected += 1,
                Err(e) => log::debug!("Candidate {:?} dropped: {}", rect, e),
            }
        }

        {
            let mut diagnostics = self.diagnostics.lock();
            diagnostics.candidates_examined += examined;
            diagnostics.candidates_rejected_format += rejected;
        }

        Ok(winner.and_then(|w| {
            let confidence = calculate_confidence(true, w.aspect_ratio, w.contour_area);
            PlateDetectionResult::new(&w.text, confidence, w.bounding_box, DetectionSource::Engine)
        }))
    }

    /// Binarize, close and read one candidate. Ok(None) when the text is not a plate.
    fn read_candidate(
        &self,
        engine: &dyn VisionEngine,
        candidate: &PlateCandidateRegion<'_>,
    ) -> Result<Option<String>, VisionError> {
        let binary = self.scratch.track(engine.binarize(&candidate.pixels)?);
        let cleaned = self.scratch.track(engine.close(&binary)?);
        let Some(raw) = engine.extract_text(&cleaned)? else {
            return Ok(None);
        };

        let text = format::clean_plate_text(&raw);
        if format::is_valid_plate_format(&text) {
            Ok(Some(text))
        } else {
            log::debug!("Rejected text {:?} (not a plate)", raw);
            Ok(None)
        }
    }
}
