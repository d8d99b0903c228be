use thiserror::Error;

/// Errors reported by `FrameSource` when the capture lifecycle fails.
///
/// Every variant except `AlreadyStarted` and `Aborted` leaves the source in
/// `CaptureState::Failed`, from which `start()` may be retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera access requires a secure context (encrypted transport or loopback host)")]
    InsecureContext,

    #[error("camera capture is not supported on this host")]
    Unsupported,

    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera device found")]
    DeviceNotFound,

    #[error("camera is already in use by another application")]
    DeviceBusy,

    #[error("camera constraints could not be satisfied: {0}")]
    ConstraintsUnsatisfiable(String),

    #[error("video playback failed: {0}")]
    PlaybackFailed(String),

    #[error("invalid capture configuration: {0}")]
    InvalidConfiguration(String),

    #[error("capture already started")]
    AlreadyStarted,

    #[error("capture stopped while the device was being negotiated")]
    Aborted,

    #[error("unknown capture error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Whether this error moves the source into `Failed`.
    pub fn is_lifecycle_failure(&self) -> bool {
        !matches!(self, Self::AlreadyStarted | Self::Aborted)
    }
}

/// Raw failures reported by the device capture layer.
///
/// Names follow the host media APIs; `FrameSource` maps them into
/// [`CaptureError`] before reporting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("access to the device was not allowed")]
    NotAllowed,

    #[error("no matching device")]
    NotFound,

    #[error("device could not be read")]
    NotReadable,

    #[error("constraint `{0}` could not be satisfied")]
    Overconstrained(String),

    #[error("operation not supported")]
    NotSupported,

    #[error("insecure context")]
    Security,

    #[error("{0}")]
    Other(String),
}

impl DeviceError {
    /// Whether retrying with relaxed constraints could change the outcome.
    pub fn is_constraint_sensitive(&self) -> bool {
        matches!(self, Self::Overconstrained(_) | Self::NotReadable | Self::Other(_))
    }
}

impl From<DeviceError> for CaptureError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::NotAllowed => CaptureError::PermissionDenied,
            DeviceError::NotFound => CaptureError::DeviceNotFound,
            DeviceError::NotReadable => CaptureError::DeviceBusy,
            DeviceError::Overconstrained(constraint) => {
                CaptureError::ConstraintsUnsatisfiable(constraint)
            }
            DeviceError::NotSupported => CaptureError::Unsupported,
            DeviceError::Security => CaptureError::InsecureContext,
            DeviceError::Other(message) => CaptureError::Unknown(message),
        }
    }
}

/// Failures inside the per-frame pixel pipeline.
///
/// These never escape `PlateRecognizer::detect`; a failing frame simply
/// yields no detection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VisionError {
    #[error("unreadable frame: {0}")]
    InvalidFrame(String),

    #[error("vision engine failure: {0}")]
    Engine(String),

    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    #[error("invalid recognizer configuration: {0}")]
    Configuration(String),
}
