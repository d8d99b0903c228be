use serde::{Deserialize, Serialize};

use super::error::CaptureError;
use super::frame::FrameDimensions;

/// Frame source lifecycle.
///
/// State transitions:
/// ```text
/// idle → acquiring → active
///   ↑        ↓         ↓
///   └──── failed ←─────┘ (stop() from any state → idle)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Acquiring,
    Active { dimensions: FrameDimensions },
    Failed(CaptureError),
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// `Acquiring` or `Active`: a second `start()` must be rejected.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Acquiring | Self::Active { .. })
    }

    /// Native stream dimensions, when active.
    pub fn dimensions(&self) -> Option<FrameDimensions> {
        match self {
            Self::Active { dimensions } => Some(*dimensions),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CaptureError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Camera permission as reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
    Prompt,
}

/// Availability of the external vision engine, as carried by `EngineHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Loading,
    Ready,
    Unavailable,
}

/// Recognizer view of engine availability.
///
/// `Unavailable` is reached by initialization timeout and is sticky, except
/// that a later readiness signal from the engine promotes it to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerState {
    Uninitialized,
    Initializing,
    Ready,
    Unavailable,
}
