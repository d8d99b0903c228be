//! Scripted fakes shared by the in-crate unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use image::{GrayImage, RgbaImage};
use parking_lot::Mutex;

use crate::models::config::CaptureConfiguration;
use crate::models::detection::PlateDetectionResult;
use crate::models::error::{CaptureError, DeviceError, VisionError};
use crate::models::frame::{BoundingBox, Contour, FrameDimensions, FrameSnapshot, Point};
use crate::models::state::{CaptureState, PermissionState};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_device::{CaptureDevice, PermissionCallback, PermissionMonitor, VideoStream};
use crate::traits::vision_engine::VisionEngine;

pub fn blank_frame(width: u32, height: u32) -> FrameSnapshot {
    FrameSnapshot::new(RgbaImage::new(width, height), 1)
}

// --- Vision ---

/// One plate-like contour the scripted engine will report.
#[derive(Debug, Clone)]
pub struct ScriptedCandidate {
    pub rect: BoundingBox,
    pub area: f64,
    pub text: String,
}

impl ScriptedCandidate {
    pub fn new(rect: BoundingBox, area: f64, text: &str) -> Self {
        Self {
            rect,
            area,
            text: text.into(),
        }
    }

    fn contour(&self) -> Contour {
        let (x, y) = (self.rect.x as i32, self.rect.y as i32);
        let (right, bottom) = (x + self.rect.width as i32 - 1, y + self.rect.height as i32 - 1);
        Contour::new(vec![
            Point::new(x, y),
            Point::new(right, y),
            Point::new(right, bottom),
            Point::new(x, bottom),
        ])
    }
}

/// Vision engine that reports scripted contours and texts.
///
/// Areas and texts are looked up by rectangle, so candidates in one script
/// need distinct sizes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    pub candidates: Vec<ScriptedCandidate>,
    pub fail_grayscale: bool,
    pub fail_text: bool,
    pub concurrent: bool,
    /// How long `to_grayscale` lingers; cut short once two calls overlap.
    pub hold: Duration,
    pub(crate) text_calls: Arc<AtomicUsize>,
    pub(crate) in_flight: Arc<AtomicUsize>,
    pub(crate) peak_in_flight: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn with_candidates(candidates: Vec<ScriptedCandidate>) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    /// Most `to_grayscale` calls ever running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn linger(&self) {
        let deadline = Instant::now() + self.hold;
        while Instant::now() < deadline {
            let running = self.in_flight.load(Ordering::SeqCst);
            self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
            if running > 1 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl VisionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn to_grayscale(&self, frame: &RgbaImage) -> Result<GrayImage, VisionError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        self.linger();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_grayscale {
            return Err(VisionError::Engine("scripted grayscale failure".into()));
        }
        Ok(GrayImage::new(frame.width(), frame.height()))
    }

    fn blur(&self, gray: &GrayImage) -> Result<GrayImage, VisionError> {
        Ok(gray.clone())
    }

    fn detect_edges(&self, gray: &GrayImage) -> Result<GrayImage, VisionError> {
        Ok(gray.clone())
    }

    fn find_contours(&self, _edges: &GrayImage) -> Result<Vec<Contour>, VisionError> {
        Ok(self.candidates.iter().map(ScriptedCandidate::contour).collect())
    }

    fn contour_area(&self, contour: &Contour) -> f64 {
        let rect = contour.bounding_box();
        self.candidates
            .iter()
            .find(|c| c.rect == rect)
            .map_or_else(|| contour.area(), |c| c.area)
    }

    fn binarize(&self, gray: &GrayImage) -> Result<GrayImage, VisionError> {
        Ok(gray.clone())
    }

    fn close(&self, binary: &GrayImage) -> Result<GrayImage, VisionError> {
        Ok(binary.clone())
    }

    fn extract_text(&self, region: &GrayImage) -> Result<Option<String>, VisionError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_text {
            return Err(VisionError::TextExtraction("scripted reader failure".into()));
        }
        let (width, height) = region.dimensions();
        Ok(self
            .candidates
            .iter()
            .find(|c| c.rect.width == width && c.rect.height == height)
            .map(|c| c.text.clone()))
    }

    fn supports_concurrent_use(&self) -> bool {
        self.concurrent
    }
}

// --- Capture ---

/// Shared record of what a scripted device was asked to do.
#[derive(Debug, Default)]
pub struct DeviceLog {
    pub requested: Mutex<Vec<CaptureConfiguration>>,
    pub streams_stopped: AtomicUsize,
}

impl DeviceLog {
    pub fn requested(&self) -> Vec<CaptureConfiguration> {
        self.requested.lock().clone()
    }

    pub fn streams_stopped(&self) -> usize {
        self.streams_stopped.load(Ordering::SeqCst)
    }
}

/// Camera whose answers are scripted per open attempt.
#[derive(Debug)]
pub struct ScriptedDevice {
    pub supported: bool,
    /// One entry per `open_stream` call; the last entry repeats.
    pub open_results: Vec<Result<FrameDimensions, DeviceError>>,
    pub ready_error: Option<DeviceError>,
    pub play_error: Option<DeviceError>,
    /// Size of the frame the sink presents, when it differs from the native size.
    pub presented_size: Option<FrameDimensions>,
    pub open_delay: Duration,
    pub log: Arc<DeviceLog>,
}

impl ScriptedDevice {
    pub fn serving(dimensions: FrameDimensions) -> Self {
        Self::with_results(vec![Ok(dimensions)])
    }

    pub fn with_results(open_results: Vec<Result<FrameDimensions, DeviceError>>) -> Self {
        Self {
            supported: true,
            open_results,
            ready_error: None,
            play_error: None,
            presented_size: None,
            open_delay: Duration::ZERO,
            log: Arc::new(DeviceLog::default()),
        }
    }
}

impl CaptureDevice for ScriptedDevice {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn open_stream(&mut self, config: &CaptureConfiguration) -> Result<Box<dyn VideoStream>, DeviceError> {
        let attempt = {
            let mut requested = self.log.requested.lock();
            requested.push(config.clone());
            requested.len() - 1
        };
        if !self.open_delay.is_zero() {
            thread::sleep(self.open_delay);
        }

        let index = attempt.min(self.open_results.len().saturating_sub(1));
        let native = self
            .open_results
            .get(index)
            .cloned()
            .unwrap_or(Ok(FrameDimensions::new(640, 480)))?;
        let presented = self.presented_size.unwrap_or(native);

        Ok(Box::new(ScriptedStream {
            native,
            frame: RgbaImage::new(presented.width, presented.height),
            ready_error: self.ready_error.clone(),
            play_error: self.play_error.clone(),
            playing: false,
            stopped: false,
            log: Arc::clone(&self.log),
        }))
    }

    fn label(&self) -> String {
        "scripted camera".into()
    }
}

struct ScriptedStream {
    native: FrameDimensions,
    frame: RgbaImage,
    ready_error: Option<DeviceError>,
    play_error: Option<DeviceError>,
    playing: bool,
    stopped: bool,
    log: Arc<DeviceLog>,
}

impl VideoStream for ScriptedStream {
    fn wait_ready(&mut self, _timeout: Duration) -> Result<FrameDimensions, DeviceError> {
        match self.ready_error.clone() {
            Some(e) => Err(e),
            None => Ok(self.native),
        }
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        if let Some(e) = self.play_error.clone() {
            return Err(e);
        }
        self.playing = true;
        Ok(())
    }

    fn copy_presented_frame(&self) -> Option<RgbaImage> {
        (self.playing && !self.stopped).then(|| self.frame.clone())
    }

    fn stop_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.log.streams_stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Permission source the test drives by hand.
#[derive(Default)]
pub struct ScriptedMonitor {
    pub initial: Option<PermissionState>,
    callbacks: Mutex<Vec<PermissionCallback>>,
}

impl ScriptedMonitor {
    pub fn reporting(initial: PermissionState) -> Self {
        Self {
            initial: Some(initial),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn emit(&self, permission: PermissionState) {
        let callbacks = self.callbacks.lock().clone();
        for callback in callbacks {
            callback(permission);
        }
    }
}

impl PermissionMonitor for ScriptedMonitor {
    fn query(&self) -> Option<PermissionState> {
        self.initial
    }

    fn subscribe(&self, callback: PermissionCallback) {
        self.callbacks.lock().push(callback);
    }
}

// --- Delegate ---

#[derive(Debug, Default)]
pub struct RecordingDelegate {
    pub states: Mutex<Vec<CaptureState>>,
    pub permissions: Mutex<Vec<PermissionState>>,
    pub errors: Mutex<Vec<CaptureError>>,
    pub detections: Mutex<Vec<String>>,
}

impl CaptureDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        self.states.lock().push(state.clone());
    }

    fn on_permission_changed(&self, permission: PermissionState) {
        self.permissions.lock().push(permission);
    }

    fn on_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }

    fn on_detection(&self, result: &PlateDetectionResult) {
        self.detections.lock().push(result.plate_text().to_string());
    }
}
