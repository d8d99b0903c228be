use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::capture::frame_source::FrameSource;
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::frame::FrameDimensions;
use crate::recognition::recognizer::PlateRecognizer;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_device::CaptureDevice;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(500);

/// Counters for the scan loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub ticks: u64,
    /// Ticks where the source had no frame to hand out.
    pub missed_snapshots: u64,
    pub detections: u64,
}

/// Periodic snapshot → detect driver.
///
/// Data flow:
/// ```text
/// [FrameSource] ──snapshot every interval──▶ [PlateRecognizer] ──▶ delegate.on_detection
/// ```
///
/// The loop runs on a named background thread between `start` and `stop`.
/// Dropping the session stops the loop and releases the camera.
pub struct ScanSession<D: CaptureDevice + 'static> {
    source: Arc<FrameSource<D>>,
    recognizer: Arc<PlateRecognizer>,
    interval: Duration,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    stats: Arc<Mutex<ScanStats>>,

    // Scan thread control
    running: Arc<AtomicBool>,
    scan_handle: Option<thread::JoinHandle<()>>,
}

impl<D: CaptureDevice + 'static> ScanSession<D> {
    pub fn new(source: FrameSource<D>, recognizer: Arc<PlateRecognizer>) -> Self {
        Self {
            source: Arc::new(source),
            recognizer,
            interval: DEFAULT_SCAN_INTERVAL,
            delegate: None,
            stats: Arc::new(Mutex::new(ScanStats::default())),
            running: Arc::new(AtomicBool::new(false)),
            scan_handle: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Receive both capture and detection events.
    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.source.set_delegate(Arc::clone(&delegate));
        self.delegate = Some(delegate);
    }

    pub fn source(&self) -> &FrameSource<D> {
        &self.source
    }

    pub fn recognizer(&self) -> &Arc<PlateRecognizer> {
        &self.recognizer
    }

    pub fn stats(&self) -> ScanStats {
        self.stats.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the camera, then the scan loop.
    pub fn start(&mut self, config: &CaptureConfiguration) -> Result<FrameDimensions, CaptureError> {
        if self.scan_handle.is_some() {
            return Err(CaptureError::AlreadyStarted);
        }

        let dimensions = self.source.start(config)?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let source = Arc::clone(&self.source);
        let recognizer = Arc::clone(&self.recognizer);
        let delegate = self.delegate.clone();
        let stats = Arc::clone(&self.stats);
        let interval = self.interval;

        let spawned = thread::Builder::new().name("plate-scan".into()).spawn(move || {
            let mut next_tick = Instant::now();
            while running.load(Ordering::SeqCst) {
                next_tick += interval;

                match source.capture_snapshot() {
                    Some(snapshot) => {
                        let detection = recognizer.detect(snapshot);
                        let mut s = stats.lock();
                        s.ticks += 1;
                        if let Some(result) = detection {
                            s.detections += 1;
                            drop(s);
                            log::info!(
                                "Plate {} ({}, {:.2})",
                                result.plate_text(),
                                result.format(),
                                result.confidence()
                            );
                            if let Some(ref d) = delegate {
                                d.on_detection(&result);
                            }
                        }
                    }
                    None => {
                        let mut s = stats.lock();
                        s.ticks += 1;
                        s.missed_snapshots += 1;
                    }
                }

                // Woken early by stop().
                thread::park_timeout(next_tick.saturating_duration_since(Instant::now()));
            }
        });

        match spawned {
            Ok(handle) => {
                self.scan_handle = Some(handle);
                log::info!(
                    "[{}] Scanning every {}ms",
                    self.source.session_id(),
                    self.interval.as_millis()
                );
                Ok(dimensions)
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.source.stop();
                Err(CaptureError::Unknown(format!("failed to spawn scan thread: {}", e)))
            }
        }
    }

    /// Stop the scan loop and release the camera. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.scan_handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::error!("Scan thread panicked");
            }
        }
        self.source.stop();
    }
}

impl<D: CaptureDevice + 'static> Drop for ScanSession<D> {
    fn drop(&mut self) {
        self.stop();
    }
}
