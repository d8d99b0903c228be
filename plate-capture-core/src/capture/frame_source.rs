use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use image::imageops::{self, FilterType};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::config::CaptureConfiguration;
use crate::models::error::{CaptureError, DeviceError};
use crate::models::frame::{FrameDimensions, FrameSnapshot};
use crate::models::state::{CaptureState, PermissionState};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_device::{CaptureDevice, PermissionMonitor, VideoStream};

/// Default bound on the wait for the sink to report its dimensions.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the capture code is running, for the secure-context precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub host: String,
    pub encrypted_transport: bool,
}

impl ExecutionContext {
    pub fn new(host: impl Into<String>, encrypted_transport: bool) -> Self {
        Self {
            host: host.into(),
            encrypted_transport,
        }
    }

    /// Native process on the local machine.
    pub fn local() -> Self {
        Self::new("localhost", false)
    }

    /// Encrypted transport, or a loopback host.
    pub fn is_secure(&self) -> bool {
        if self.encrypted_transport {
            return true;
        }
        let host = self.host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();
        if host == "localhost" || host.ends_with(".localhost") {
            return true;
        }
        host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::local()
    }
}

struct SourceStatus {
    capture: CaptureState,
    permission: PermissionState,
    /// Bumped by every `start` and `stop`; a negotiation only commits if its
    /// attempt is still current.
    attempt: u64,
}

struct Shared {
    status: Mutex<SourceStatus>,
    delegate: Mutex<Option<Arc<dyn CaptureDelegate>>>,
}

impl Shared {
    fn delegate(&self) -> Option<Arc<dyn CaptureDelegate>> {
        self.delegate.lock().clone()
    }

    fn publish_state(&self, state: &CaptureState) {
        if let Some(delegate) = self.delegate() {
            delegate.on_state_changed(state);
        }
    }

    fn set_permission(&self, permission: PermissionState) {
        {
            let mut status = self.status.lock();
            if status.permission == permission {
                return;
            }
            status.permission = permission;
        }
        if let Some(delegate) = self.delegate() {
            delegate.on_permission_changed(permission);
        }
    }
}

/// Owns one camera device and hands out frame snapshots.
///
/// State machine:
/// ```text
/// Idle ──start──▶ Acquiring ──▶ Active
///   ▲                 │           │
///   │                 ▼           │
///   └────stop──── Failed ◀────────┘ (stop from any state → Idle)
/// ```
///
/// All operations take `&self`; share with `Arc<FrameSource<D>>`. `stop()`
/// never waits on an in-flight negotiation: the negotiation notices it was
/// superseded, releases its stream and returns [`CaptureError::Aborted`].
/// Dropping the source stops it.
pub struct FrameSource<D: CaptureDevice> {
    device: Mutex<D>,
    context: ExecutionContext,
    ready_timeout: Duration,
    session_id: Uuid,
    shared: Arc<Shared>,
    stream: Mutex<Option<Box<dyn VideoStream>>>,
    snapshot_sequence: AtomicU64,
    monitor: Mutex<Option<Arc<dyn PermissionMonitor>>>,
}

impl<D: CaptureDevice> FrameSource<D> {
    pub fn new(device: D, context: ExecutionContext) -> Self {
        Self {
            device: Mutex::new(device),
            context,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            session_id: Uuid::new_v4(),
            shared: Arc::new(Shared {
                status: Mutex::new(SourceStatus {
                    capture: CaptureState::Idle,
                    permission: PermissionState::Unknown,
                    attempt: 0,
                }),
                delegate: Mutex::new(None),
            }),
            stream: Mutex::new(None),
            snapshot_sequence: AtomicU64::new(0),
            monitor: Mutex::new(None),
        }
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn set_delegate(&self, delegate: Arc<dyn CaptureDelegate>) {
        *self.shared.delegate.lock() = Some(delegate);
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> CaptureState {
        self.shared.status.lock().capture.clone()
    }

    pub fn permission(&self) -> PermissionState {
        self.shared.status.lock().permission
    }

    /// Mirror the platform camera permission for as long as this source lives.
    pub fn observe_permissions(&self, monitor: Arc<dyn PermissionMonitor>) {
        if let Some(initial) = monitor.query() {
            self.shared.set_permission(initial);
        }

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let session_id = self.session_id;
        monitor.subscribe(Arc::new(move |permission| {
            if let Some(shared) = weak.upgrade() {
                log::debug!("[{}] Camera permission now {:?}", session_id, permission);
                shared.set_permission(permission);
            }
        }));

        *self.monitor.lock() = Some(monitor);
    }

    /// Acquire the camera and start playback.
    ///
    /// Tries `config` first and, if the device rejects it in a way relaxed
    /// constraints could fix, once more with [`CaptureConfiguration::fallback`].
    /// Returns the stream's native dimensions.
    pub fn start(&self, config: &CaptureConfiguration) -> Result<FrameDimensions, CaptureError> {
        let attempt = {
            let mut status = self.shared.status.lock();
            if status.capture.is_busy() {
                return Err(CaptureError::AlreadyStarted);
            }
            status.attempt += 1;
            status.capture = CaptureState::Acquiring;
            status.attempt
        };
        self.shared.publish_state(&CaptureState::Acquiring);

        if let Err(e) = config.validate() {
            return Err(self.fail(attempt, CaptureError::InvalidConfiguration(e)));
        }
        if !self.context.is_secure() {
            return Err(self.fail(attempt, CaptureError::InsecureContext));
        }

        let negotiated = {
            let mut device = self.device.lock();
            if !device.is_supported() {
                drop(device);
                return Err(self.fail(attempt, CaptureError::Unsupported));
            }
            log::info!(
                "[{}] Opening {} at {}x{}",
                self.session_id,
                device.label(),
                config.ideal_width,
                config.ideal_height
            );
            self.negotiate(&mut *device, config)
        };

        let (stream, dimensions) = match negotiated {
            Ok(opened) => opened,
            Err(e) => return Err(self.fail(attempt, e)),
        };

        self.commit(attempt, stream, dimensions)
    }

    /// Release the device and return to `Idle`. Safe from any state.
    pub fn stop(&self) {
        let was = {
            let mut status = self.shared.status.lock();
            status.attempt += 1;
            std::mem::replace(&mut status.capture, CaptureState::Idle)
        };

        if let Some(mut stream) = self.stream.lock().take() {
            stream.stop_tracks();
            log::info!("[{}] Camera released", self.session_id);
        }

        if !was.is_idle() {
            self.shared.publish_state(&CaptureState::Idle);
        }
    }

    /// Copy the frame currently presented, at the stream's native size.
    ///
    /// None unless `Active`. Never waits for a new frame.
    pub fn capture_snapshot(&self) -> Option<FrameSnapshot> {
        let native = self.shared.status.lock().capture.dimensions()?;
        let presented = self.stream.lock().as_ref()?.copy_presented_frame()?;

        let image = if presented.dimensions() == (native.width, native.height) {
            presented
        } else {
            imageops::resize(&presented, native.width, native.height, FilterType::Triangle)
        };

        let sequence = self.snapshot_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Some(FrameSnapshot::new(image, sequence))
    }

    // --- Internal helpers ---

    fn negotiate(
        &self,
        device: &mut D,
        config: &CaptureConfiguration,
    ) -> Result<(Box<dyn VideoStream>, FrameDimensions), CaptureError> {
        let mut stream = match device.open_stream(config) {
            Ok(stream) => stream,
            Err(first) if first.is_constraint_sensitive() => {
                log::warn!(
                    "[{}] Camera rejected ideal constraints ({}), retrying at fallback resolution",
                    self.session_id,
                    first
                );
                device.open_stream(&CaptureConfiguration::fallback()).map_err(|second| {
                    match (first, second) {
                        (DeviceError::Overconstrained(_), DeviceError::Overconstrained(c)) => {
                            CaptureError::ConstraintsUnsatisfiable(c)
                        }
                        (_, second) => CaptureError::from(second),
                    }
                })?
            }
            Err(first) => return Err(first.into()),
        };

        let dimensions = match stream.wait_ready(self.ready_timeout) {
            Ok(dimensions) if !dimensions.is_empty() => dimensions,
            Ok(dimensions) => {
                stream.stop_tracks();
                return Err(CaptureError::PlaybackFailed(format!(
                    "sink reported empty dimensions {}x{}",
                    dimensions.width, dimensions.height
                )));
            }
            Err(e) => {
                stream.stop_tracks();
                return Err(CaptureError::PlaybackFailed(e.to_string()));
            }
        };

        if let Err(e) = stream.play() {
            stream.stop_tracks();
            return Err(CaptureError::PlaybackFailed(e.to_string()));
        }

        Ok((stream, dimensions))
    }

    fn commit(
        &self,
        attempt: u64,
        mut stream: Box<dyn VideoStream>,
        dimensions: FrameDimensions,
    ) -> Result<FrameDimensions, CaptureError> {
        let active = CaptureState::Active { dimensions };
        {
            let mut status = self.shared.status.lock();
            if status.attempt != attempt {
                drop(status);
                stream.stop_tracks();
                log::info!("[{}] Stopped during negotiation, releasing camera", self.session_id);
                return Err(CaptureError::Aborted);
            }
            *self.stream.lock() = Some(stream);
            status.capture = active.clone();
        }

        log::info!(
            "[{}] Camera active at {}x{}",
            self.session_id,
            dimensions.width,
            dimensions.height
        );
        self.shared.publish_state(&active);
        Ok(dimensions)
    }

    /// Record a lifecycle failure for `attempt` unless it was superseded.
    fn fail(&self, attempt: u64, error: CaptureError) -> CaptureError {
        let failed = CaptureState::Failed(error.clone());
        {
            let mut status = self.shared.status.lock();
            if status.attempt != attempt {
                return CaptureError::Aborted;
            }
            status.capture = failed.clone();
        }

        log::error!("[{}] Camera start failed: {}", self.session_id, error);
        self.shared.publish_state(&failed);
        if let Some(delegate) = self.shared.delegate() {
            delegate.on_error(&error);
        }
        error
    }
}

impl<D: CaptureDevice> Drop for FrameSource<D> {
    fn drop(&mut self) {
        self.stop();
    }
}
